//! Reconnaissance planner: turns (domains, entities, complexity) into a
//! bounded, deduplicated list of read-only probe commands.

mod domains;

use crate::complexity::Complexity;
use crate::intent::{Domain, Entities};
use crate::safety;

/// Global probe cap per complexity tier.
fn global_cap(complexity: Complexity) -> usize {
    match complexity {
        Complexity::Trivial => 0,
        Complexity::Simple => 5,
        Complexity::Moderate => 10,
        Complexity::Complex => 20,
    }
}

/// How many probes each domain generator may contribute.
fn per_domain_slice(complexity: Complexity) -> usize {
    match complexity {
        Complexity::Trivial => 0,
        Complexity::Simple => 3,
        Complexity::Moderate => 5,
        Complexity::Complex => usize::MAX,
    }
}

/// Synthesize the probe list. Every entity value is re-validated and shell
/// quoted before interpolation; anything failing validation is treated as
/// absent. The returned list is deduplicated (first occurrence wins), capped,
/// and every entry has passed the safety gate.
pub fn plan(
    domains: &[Domain],
    entities: &Entities,
    query: &str,
    complexity: Complexity,
) -> Vec<String> {
    if complexity == Complexity::Trivial {
        return Vec::new();
    }

    let slice = per_domain_slice(complexity);
    let mut probes: Vec<String> = Vec::new();
    for domain in domains {
        let mut generated = domains::generate(*domain, entities);
        generated.truncate(slice);
        probes.extend(generated);
    }

    let mut seen = std::collections::HashSet::new();
    probes.retain(|probe| seen.insert(probe.clone()));
    probes.truncate(global_cap(complexity));

    probes.retain(|probe| match safety::vet(probe) {
        Ok(()) => true,
        Err(reason) => {
            tracing::warn!(%probe, %reason, "planner emitted unsafe probe, dropping");
            false
        }
    });

    tracing::debug!(
        query,
        complexity = complexity.as_str(),
        count = probes.len(),
        "planned scout probes"
    );
    probes
}

// --- Entity validation and quoting, shared by the domain generators ---

/// POSIX-quote a validated value. Validation narrows the character set; the
/// quoting is the actual guarantee.
fn shell_quote(value: &str) -> Option<String> {
    shlex::try_quote(value).ok().map(|q| q.to_string())
}

pub(crate) fn port_arg(value: &Option<String>) -> Option<String> {
    let port = value.as_deref()?;
    let digits = port.len() <= 5 && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit());
    if !digits {
        return None;
    }
    let n: u32 = port.parse().ok()?;
    (n > 0 && n < 65536).then(|| port.to_string())
}

pub(crate) fn name_arg(value: &Option<String>) -> Option<String> {
    let name = value.as_deref()?;
    let ok = (1..=128).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._:@+-".contains(&b));
    if !ok {
        return None;
    }
    shell_quote(name)
}

pub(crate) fn path_arg(value: &Option<String>) -> Option<String> {
    let path = value.as_deref()?;
    let ok = !path.is_empty()
        && path
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._/~@+-".contains(&b));
    if !ok {
        return None;
    }
    shell_quote(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities() -> Entities {
        Entities::default()
    }

    #[test]
    fn test_trivial_plans_nothing() {
        let probes = plan(
            &[Domain::System],
            &entities(),
            "uptime",
            Complexity::Trivial,
        );
        assert!(probes.is_empty());
    }

    #[test]
    fn test_simple_cap() {
        let probes = plan(
            &[Domain::System, Domain::Network],
            &entities(),
            "overview",
            Complexity::Simple,
        );
        assert!(probes.len() <= 5);
    }

    #[test]
    fn test_moderate_cap() {
        let probes = plan(
            &[Domain::System, Domain::Network, Domain::Storage],
            &entities(),
            "overview",
            Complexity::Moderate,
        );
        assert!(probes.len() <= 10);
    }

    #[test]
    fn test_complex_cap() {
        let probes = plan(
            &Domain::ALL,
            &entities(),
            "everything",
            Complexity::Complex,
        );
        assert!(probes.len() <= 20);
    }

    #[test]
    fn test_all_probes_pass_safety_gate() {
        let rich = Entities {
            target: Some("nginx".into()),
            path: Some("/var/log/nginx".into()),
            port: Some("8080".into()),
            service: Some("nginx".into()),
            package: Some("curl".into()),
            container: Some("webapp".into()),
            user: Some("deploy".into()),
            ip: Some("10.0.0.1".into()),
            pid: Some("4242".into()),
            filename: Some("app.log".into()),
            domain: Some("example.com".into()),
            tool: Some("docker".into()),
        };
        for domain in Domain::ALL {
            let probes = plan(&[domain], &rich, "check", Complexity::Complex);
            for probe in &probes {
                assert!(
                    crate::safety::is_safe(probe),
                    "unsafe probe from {domain:?}: {probe}"
                );
            }
        }
    }

    #[test]
    fn test_port_probe_shape() {
        let e = Entities {
            port: Some("8080".into()),
            ..Entities::default()
        };
        let probes = plan(&[Domain::Network], &e, "端口 8080", Complexity::Moderate);
        assert!(probes.iter().any(|p| p == "ss -tlnp 'sport = :8080'"));
    }

    #[test]
    fn test_dedup_preserves_first_occurrence() {
        // process and system both contribute `free -h`.
        let probes = plan(
            &[Domain::Process, Domain::System],
            &entities(),
            "overview",
            Complexity::Complex,
        );
        let count = probes.iter().filter(|p| p.as_str() == "free -h").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_invalid_entities_treated_absent() {
        assert_eq!(port_arg(&Some("99999".into())), None);
        assert_eq!(port_arg(&Some("0".into())), None);
        assert_eq!(port_arg(&Some("80a".into())), None);
        assert_eq!(name_arg(&Some("bad name".into())), None);
        assert_eq!(name_arg(&Some("$(id)".into())), None);
        assert_eq!(path_arg(&Some("/tmp/$(id)".into())), None);
        assert_eq!(path_arg(&Some("/var/log".into())), Some("/var/log".into()));
    }

    #[test]
    fn test_malicious_service_name_falls_back() {
        let e = Entities {
            service: Some("nginx; rm -rf /".into()),
            ..Entities::default()
        };
        let probes = plan(&[Domain::Service], &e, "check", Complexity::Moderate);
        // Name validation fails, so the planner lists units instead.
        assert!(probes.iter().all(|p| !p.contains("rm")));
        assert!(probes.iter().any(|p| p.starts_with("systemctl list-units")));
    }
}
