//! Access URLs
//!
//! Externally reachable addresses of a release, taken from LoadBalancer
//! services that have been assigned an address and from ingress rules.

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use serde_json::Value;

/// URLs of every loaded LoadBalancer service, in payload order
pub fn service_urls(services: &[Value]) -> Vec<String> {
    let mut urls = Vec::new();
    for payload in services {
        let Ok(service) = serde_json::from_value::<Service>(payload.clone()) else {
            tracing::debug!("Skipping service payload that does not decode");
            continue;
        };

        let Some(spec) = service.spec.as_ref() else {
            continue;
        };
        if spec.type_.as_deref() != Some("LoadBalancer") {
            continue;
        }

        let addresses: Vec<String> = service
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|ingress| {
                ingress
                    .iter()
                    .filter_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for address in &addresses {
            for port in spec.ports.iter().flatten() {
                let scheme = if port.port == 443 { "https" } else { "http" };
                urls.push(format!("{}://{}:{}", scheme, address, port.port));
            }
        }
    }
    urls
}

/// URLs of every host rule of the loaded ingresses, in payload order
pub fn ingress_urls(ingresses: &[Value]) -> Vec<String> {
    let mut urls = Vec::new();
    for payload in ingresses {
        let Ok(ingress) = serde_json::from_value::<Ingress>(payload.clone()) else {
            tracing::debug!("Skipping ingress payload that does not decode");
            continue;
        };
        let Some(spec) = ingress.spec.as_ref() else {
            continue;
        };

        let tls_hosts: Vec<&str> = spec
            .tls
            .iter()
            .flatten()
            .flat_map(|tls| tls.hosts.iter().flatten())
            .map(String::as_str)
            .collect();

        for rule in spec.rules.iter().flatten() {
            let Some(host) = rule.host.as_deref() else {
                continue;
            };
            let scheme = if tls_hosts.contains(&host) {
                "https"
            } else {
                "http"
            };

            let paths: Vec<&str> = rule
                .http
                .as_ref()
                .map(|http| {
                    http.paths
                        .iter()
                        .filter_map(|p| p.path.as_deref())
                        .collect()
                })
                .unwrap_or_default();

            if paths.is_empty() {
                urls.push(format!("{}://{}", scheme, host));
            } else {
                for path in paths {
                    urls.push(format!("{}://{}{}", scheme, host, path));
                }
            }
        }
    }
    urls
}

/// Service URLs followed by ingress URLs
pub fn access_urls(services: &[Value], ingresses: &[Value]) -> Vec<String> {
    let mut urls = service_urls(services);
    urls.extend(ingress_urls(ingresses));
    urls
}
