//! Per-domain probe generators. Each returns an ordered list of read-only
//! commands parameterized by validated, quoted entity values.

use crate::intent::{Domain, Entities};

use super::{name_arg, path_arg, port_arg};

pub(super) fn generate(domain: Domain, entities: &Entities) -> Vec<String> {
    match domain {
        Domain::File => file_probes(entities),
        Domain::Process => process_probes(entities),
        Domain::Network => network_probes(entities),
        Domain::Service => service_probes(entities),
        Domain::System => system_probes(),
        Domain::Software => software_probes(entities),
        Domain::Storage => storage_probes(entities),
        Domain::Container => container_probes(entities),
        Domain::User => user_probes(entities),
        Domain::Log => log_probes(entities),
    }
}

fn file_probes(entities: &Entities) -> Vec<String> {
    if let Some(path) = path_arg(&entities.path) {
        return vec![
            format!("ls -la {path}"),
            format!("file {path}"),
            format!("stat {path}"),
        ];
    }
    if let Some(name) = name_arg(&entities.filename) {
        return vec![
            format!("find . -maxdepth 4 -name {name} | head -10"),
            format!("find /home -maxdepth 4 -name {name} | head -10"),
            format!("locate {name} | head -10"),
        ];
    }
    vec!["pwd".to_string(), "ls -la".to_string()]
}

fn process_probes(entities: &Entities) -> Vec<String> {
    let mut probes = Vec::new();
    if let Some(pid) = name_arg(&entities.pid) {
        probes.push(format!(
            "ps -p {pid} -o pid,ppid,user,%cpu,%mem,etime,cmd"
        ));
    } else if let Some(name) = name_arg(&entities.target) {
        probes.push(format!("pgrep -af {name} | head -5"));
        probes.push(format!("ps aux | grep {name} | head -10"));
    } else if let Some(port) = port_arg(&entities.port) {
        probes.push(format!("ss -tlnp 'sport = :{port}'"));
    } else {
        probes.push("ps aux --sort=-%mem | head -10".to_string());
        probes.push("ps aux --sort=-%cpu | head -10".to_string());
    }
    probes.push("free -h".to_string());
    probes.push("uptime".to_string());
    probes
}

fn network_probes(entities: &Entities) -> Vec<String> {
    let mut probes = vec!["ip -br addr".to_string()];
    let mut targeted = false;
    if let Some(port) = port_arg(&entities.port) {
        probes.push(format!("ss -tlnp 'sport = :{port}'"));
        probes.push(format!("ss -tunap | grep :{port} | head -10"));
        targeted = true;
    }
    if let Some(ip) = name_arg(&entities.ip) {
        probes.push(format!("ping -c 2 -W 2 {ip}"));
        targeted = true;
    }
    if let Some(domain) = name_arg(&entities.domain) {
        probes.push(format!("dig +short {domain}"));
        probes.push(format!("ping -c 2 -W 2 {domain}"));
        targeted = true;
    }
    if !targeted {
        probes.push("ss -tlnH | head -20".to_string());
    }
    probes.push("cat /etc/resolv.conf".to_string());
    probes
}

fn service_probes(entities: &Entities) -> Vec<String> {
    let unit = name_arg(&entities.service).or_else(|| name_arg(&entities.target));
    if let Some(unit) = unit {
        return vec![
            format!("systemctl status {unit} --no-pager -l"),
            format!("systemctl is-active {unit}"),
            format!("systemctl is-enabled {unit}"),
            format!("journalctl -u {unit} -n 30 --no-pager"),
        ];
    }
    vec![
        "systemctl list-units --type=service --state=running --no-pager | head -20".to_string(),
        "systemctl list-units --type=service --state=failed --no-pager".to_string(),
    ]
}

fn system_probes() -> Vec<String> {
    vec![
        "uname -a".to_string(),
        "hostnamectl".to_string(),
        "uptime".to_string(),
        "free -h".to_string(),
        "df -h".to_string(),
        "lscpu | head -15".to_string(),
        "cat /etc/os-release".to_string(),
    ]
}

fn software_probes(entities: &Entities) -> Vec<String> {
    let mut probes = vec!["which apt dpkg yum dnf pacman snap pip3".to_string()];
    let package = name_arg(&entities.package).or_else(|| name_arg(&entities.target));
    if let Some(package) = package {
        probes.push(format!("dpkg -l | grep -i {package} | head -5"));
        probes.push(format!("apt-cache policy {package}"));
        probes.push(format!("pip3 show {package}"));
        probes.push(format!("snap list {package}"));
        probes.push(format!("which {package}"));
    }
    probes
}

fn storage_probes(entities: &Entities) -> Vec<String> {
    let mut probes = vec![
        "lsblk".to_string(),
        "df -h".to_string(),
        "findmnt | head -20".to_string(),
    ];
    if let Some(path) = path_arg(&entities.path) {
        probes.push(format!("df -h {path}"));
        probes.push(format!("du -sh {path}"));
        probes.push(format!("ls -la {path}"));
    } else if let Some(target) = name_arg(&entities.target) {
        probes.push(format!("findmnt | grep {target} | head -5"));
        probes.push("lsblk -o NAME,SIZE,TYPE,MOUNTPOINT | grep -v loop".to_string());
    }
    probes
}

fn container_probes(entities: &Entities) -> Vec<String> {
    let mut probes = vec![
        "which docker".to_string(),
        "which podman".to_string(),
        "which docker-compose".to_string(),
    ];
    if let Some(container) = name_arg(&entities.container) {
        probes.push(format!("docker ps -a | grep {container} | head -5"));
        probes.push(format!("docker inspect {container} | head -50"));
        probes.push(format!("docker logs --tail 20 {container}"));
    } else {
        probes.push("docker ps | head -10".to_string());
        probes.push("podman ps | head -10".to_string());
    }
    probes
}

fn user_probes(entities: &Entities) -> Vec<String> {
    let mut probes = vec!["whoami".to_string(), "id".to_string()];
    let account = name_arg(&entities.user).or_else(|| name_arg(&entities.target));
    if let Some(account) = account {
        probes.push(format!("id {account}"));
        probes.push(format!("getent passwd {account}"));
        probes.push(format!("groups {account}"));
    }
    if let Some(path) = path_arg(&entities.path) {
        probes.push(format!("ls -ld {path}"));
        probes.push(format!("getfacl {path}"));
    }
    probes.push("w".to_string());
    probes.push("last -5".to_string());
    probes
}

fn log_probes(entities: &Entities) -> Vec<String> {
    let unit = name_arg(&entities.service).or_else(|| name_arg(&entities.target));
    if let Some(unit) = unit {
        return vec![
            format!("journalctl -u {unit} -n 30 --no-pager"),
            format!("journalctl -u {unit} -p err -n 20 --no-pager"),
        ];
    }
    vec![
        "journalctl -p err -n 20 --no-pager".to_string(),
        "dmesg | tail -20".to_string(),
    ]
}
