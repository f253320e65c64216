//! Conversion of first-party entities into dynamic configuration items.

use std::collections::HashMap;

use serde::Serialize;

use crate::document::traefik::{
    AddPrefix, Domain, Headers, Middleware, RedirectScheme, Router, RouterTls, Server,
    ServerHealthCheck, Service, ServersLoadBalancer, StripPrefix,
};
use crate::document::{HttpConfiguration, ItemMap};
use crate::local::model::{
    LocalEntities, MiddlewareEntity, RouterEntity, ServiceEntity, DEFAULT_ENTRY_POINTS,
};

/// Build the local `HttpConfiguration` from `entities`.
///
/// Inactive entities and routers without hostnames are skipped. A service is
/// emitted when an emitted router references it.
pub fn to_http_configuration(entities: &LocalEntities) -> Result<HttpConfiguration, serde_json::Error> {
    let services: HashMap<&str, &ServiceEntity> = entities
        .services
        .iter()
        .filter(|service| service.active)
        .map(|service| (service.name.as_str(), service))
        .collect();
    let active_middlewares: HashMap<&str, &MiddlewareEntity> = entities
        .middlewares
        .iter()
        .filter(|middleware| middleware.active)
        .map(|middleware| (middleware.name.as_str(), middleware))
        .collect();

    let mut config = HttpConfiguration::default();

    for entity in entities.routers.iter().filter(|router| router.active) {
        if entity.hostnames.is_empty() {
            tracing::debug!(router = %entity.name, "Skipping router without hostnames");
            continue;
        }

        let router = build_router(entity, &active_middlewares);
        insert(&mut config.routers, &entity.name, &router)?;

        if entity.redirect_https {
            insert(&mut config.middlewares, &redirect_middleware_name(&entity.name), &redirect_https())?;
        }

        if config.services.contains_key(&entity.service) {
            continue;
        }
        match services.get(entity.service.as_str()) {
            Some(service) => insert(&mut config.services, &service.name, &build_service(service))?,
            None => tracing::warn!(
                router = %entity.name,
                service = %entity.service,
                "Router references an undefined or inactive service"
            ),
        }
    }

    for entity in entities.middlewares.iter().filter(|middleware| middleware.active) {
        match build_middleware(entity) {
            Some(middleware) => insert(&mut config.middlewares, &entity.name, &middleware)?,
            None => tracing::warn!(
                middleware = %entity.name,
                kind = %entity.kind,
                "Skipping middleware of unknown type"
            ),
        }
    }

    Ok(config)
}

fn insert<T: Serialize>(items: &mut ItemMap, name: &str, item: &T) -> Result<(), serde_json::Error> {
    items.insert(name.to_string(), serde_json::to_value(item)?);
    Ok(())
}

/// Name of the synthetic redirect middleware of `router`.
pub fn redirect_middleware_name(router: &str) -> String {
    format!("{router}-redirect-https")
}

fn redirect_https() -> Middleware {
    Middleware {
        redirect_scheme: Some(RedirectScheme {
            scheme: "https".into(),
            port: "443".into(),
            permanent: true,
        }),
        ..Middleware::default()
    }
}

fn build_router(entity: &RouterEntity, active_middlewares: &HashMap<&str, &MiddlewareEntity>) -> Router {
    let mut middlewares = Vec::new();
    if entity.redirect_https {
        middlewares.push(redirect_middleware_name(&entity.name));
    }
    middlewares.extend(
        entity
            .middlewares
            .iter()
            .filter(|name| active_middlewares.contains_key(name.as_str()))
            .cloned(),
    );

    let tls = entity.tls.then(|| RouterTls {
        cert_resolver: entity.cert_resolver.clone(),
        domains: tls_domains(&entity.hostnames).into_iter().collect(),
    });

    Router {
        entry_points: split_entry_points(&entity.entry_points),
        rule: host_rule(&entity.hostnames),
        service: entity.service.clone(),
        middlewares,
        tls,
    }
}

fn build_service(entity: &ServiceEntity) -> Service {
    let health_check = entity
        .health_check_path
        .as_ref()
        .filter(|path| !path.is_empty())
        .map(|path| ServerHealthCheck {
            path: path.clone(),
            interval: entity.health_check_interval_secs.map(|secs| format!("{secs}s")),
        });

    Service {
        load_balancer: ServersLoadBalancer {
            servers: entity
                .servers
                .iter()
                .map(|url| Server { url: url.clone() })
                .collect(),
            pass_host_header: Some(entity.pass_host_header),
            health_check,
        },
    }
}

fn build_middleware(entity: &MiddlewareEntity) -> Option<Middleware> {
    let settings = &entity.config;
    let middleware = match entity.kind.as_str() {
        "redirectScheme" => Middleware {
            redirect_scheme: Some(RedirectScheme {
                scheme: settings.scheme.clone(),
                port: settings.port.clone(),
                permanent: settings.permanent,
            }),
            ..Middleware::default()
        },
        "headers" => Middleware {
            headers: Some(Headers {
                custom_request_headers: settings.custom_request_headers.clone(),
                custom_response_headers: settings.custom_response_headers.clone(),
                ssl_redirect: settings.ssl_redirect,
            }),
            ..Middleware::default()
        },
        "stripPrefix" => Middleware {
            strip_prefix: Some(StripPrefix {
                prefixes: settings.prefixes.clone(),
                force_slash: settings.force_slash,
            }),
            ..Middleware::default()
        },
        "addPrefix" => Middleware {
            add_prefix: Some(AddPrefix {
                prefix: settings.prefix.clone(),
            }),
            ..Middleware::default()
        },
        _ => return None,
    };
    Some(middleware)
}

/// ``Host(`a`)`` for one hostname, ``Host(`a`, `b`)`` for several.
pub fn host_rule(hostnames: &[String]) -> String {
    let hosts: Vec<String> = hostnames.iter().map(|host| format!("`{host}`")).collect();
    format!("Host({})", hosts.join(", "))
}

/// Split a comma separated entry point list; empty means the defaults.
pub fn split_entry_points(raw: &str) -> Vec<String> {
    let source = if raw.trim().is_empty() { DEFAULT_ENTRY_POINTS } else { raw };
    source
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// `*.example.com` for `app.example.com`; None for single-label names.
pub fn parent_wildcard(hostname: &str) -> Option<String> {
    hostname
        .split_once('.')
        .filter(|(_, parent)| !parent.is_empty())
        .map(|(_, parent)| format!("*.{parent}"))
}

/// Certificate domain covering every hostname of a router.
pub fn tls_domains(hostnames: &[String]) -> Option<Domain> {
    let (main, rest) = hostnames.split_first()?;

    let mut sans: Vec<String> = parent_wildcard(main).into_iter().collect();
    for hostname in rest {
        sans.push(hostname.clone());
        sans.extend(parent_wildcard(hostname));
    }

    Some(Domain {
        main: main.clone(),
        sans,
    })
}
