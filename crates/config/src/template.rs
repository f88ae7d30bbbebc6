/// Annotated example configuration, printed by `sluice example-config`.
pub const EXAMPLE_CONFIG: &str = r#"# sluice configuration
#
# Every key is optional; the values below are the built-in defaults.

[server]
host = "0.0.0.0"       # listen address
port = 8080            # listen port
size_limit_mb = 2048   # upstream bodies declaring a larger Content-Length get 413

[log]
level = "info"         # trace | debug | info | warn | error | off (RUST_LOG wins when set)
format = "text"        # text | json

[guard]
# Exact hostnames added to the built-in allow-list. Wildcards are not supported:
# every host that may be contacted, including redirect targets, is listed on its own.
extra_hosts = []
"#;
