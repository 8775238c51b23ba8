use std::fmt::Write as _;

use tracing::info;

use crate::config::PROXY_CONFIG_PATH;
use crate::error::{DeployError, DeployResult};
use crate::proxy::Proxy;
use crate::remote::Remote;

/// Distribution default sites that would otherwise also claim
/// port 80.
pub const DEFAULT_SITES: [&str; 2] = [
    "/etc/nginx/sites-enabled/default",
    "/etc/nginx/conf.d/default.conf",
];

const PID_FILE: &str = "/run/nginx.pid";

/// Render the single server block forwarding to the app.
#[must_use]
pub fn render(proxy: &Proxy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "server {{");
    let _ = writeln!(out, "    listen {};", proxy.listen);
    let _ = writeln!(out, "    listen [::]:{};", proxy.listen);
    let _ = writeln!(out, "    server_name {};", proxy.server_name);

    if let Some(size) = &proxy.client_max_body_size {
        let _ = writeln!(out, "    client_max_body_size {size};");
    }
    for directive in &proxy.extra_directives {
        let _ = writeln!(out, "    {};", directive.trim_end_matches(';'));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "    location / {{");
    let _ = writeln!(out, "        proxy_pass {};", proxy.upstream());
    let _ = writeln!(out, "        proxy_http_version 1.1;");
    if proxy.websockets {
        let _ = writeln!(out, "        proxy_set_header Upgrade $http_upgrade;");
        let _ = writeln!(out, "        proxy_set_header Connection \"upgrade\";");
    }
    let _ = writeln!(out, "        proxy_set_header Host $host;");
    let _ = writeln!(out, "        proxy_set_header X-Real-IP $remote_addr;");
    let _ = writeln!(
        out,
        "        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;"
    );
    let _ = writeln!(out, "        proxy_set_header X-Forwarded-Proto $scheme;");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    out
}

/// Install the proxy configuration and (re)start Nginx.
///
/// The syntax check runs before anything is restarted, so a broken
/// configuration is never served.
pub fn configure(remote: &dyn Remote, proxy: &Proxy) -> DeployResult<()> {
    let sudo = remote.sudo();

    info!("Removing default Nginx sites...");
    remote.exec(&format!("{sudo}rm -f {}", DEFAULT_SITES.join(" ")))?;

    info!("Writing {PROXY_CONFIG_PATH}");
    remote.write_file(&render(proxy), PROXY_CONFIG_PATH, true)?;

    remote
        .exec(&format!("{sudo}nginx -t 2>&1"))
        .map_err(|e| DeployError::ProxyConfigInvalid(e.to_string()))?;

    info!("Releasing port {} and restarting Nginx...", proxy.listen);
    remote.exec(&format!(
        "if command -v fuser >/dev/null 2>&1; then \
         {sudo}fuser -k {}/tcp || true; fi",
        proxy.listen
    ))?;
    remote.exec(&format!(
        "if ! pgrep -x nginx >/dev/null 2>&1; then {sudo}rm -f {PID_FILE}; fi"
    ))?;
    remote.exec(&format!("{sudo}systemctl restart nginx"))?;

    info!(
        "Nginx forwarding :{} to {}",
        proxy.listen,
        proxy.upstream()
    );
    Ok(())
}
