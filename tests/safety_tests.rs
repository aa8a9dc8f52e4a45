//! Black-box laws for the command safety gate.

use shellscout::safety::{is_safe, vet};

#[test]
fn test_read_only_commands_admitted() {
    let safe = [
        "ls -la /tmp",
        "cat /etc/hosts | grep 127",
        "ps aux --sort=-%cpu | head -10",
        "ss -tlnp 'sport = :8080'",
        "systemctl status nginx --no-pager -l",
        "journalctl -u nginx -n 30 --no-pager",
        "df -h",
        "free -h",
        "uptime",
        "which docker",
        "ip -br addr",
        "find . -maxdepth 4 -name 'app.log' | head -10",
        "dig +short example.com",
        "docker ps -a | grep webapp | head -5",
        "git status",
        "dpkg -l | grep -i curl | head -5",
        "getent passwd deploy",
    ];
    for cmd in safe {
        assert!(is_safe(cmd), "expected safe: {cmd} ({:?})", vet(cmd));
    }
}

#[test]
fn test_tier1_patterns_rejected() {
    let unsafe_fragments = [
        "echo $(whoami)",
        "echo `id`",
        "cat <(ps aux)",
        "ls > out.txt",
        "ls >> out.txt",
        "ls > /dev/null",
        "wc -l < /etc/passwd",
        "true || rm -rf /",
        "ls; id",
        "sleep 1 &",
        "ls\nid",
        "printf '\\x72\\x6d'",
    ];
    for cmd in unsafe_fragments {
        assert!(!is_safe(cmd), "expected unsafe: {cmd}");
    }
}

#[test]
fn test_tier2_deny_list() {
    assert!(vet("rm -rf /").unwrap_err().contains("rm"));
    assert!(vet("sudo rm -rf /").unwrap_err().contains("rm"));
    assert!(vet("/usr/bin/rm x").unwrap_err().contains("rm"));
    assert!(!is_safe("mv a b"));
    assert!(!is_safe("chmod 777 /etc"));
    assert!(!is_safe("dd if=/dev/zero of=/dev/sda"));
    assert!(!is_safe("mkfs.ext4 /dev/sdb1"));
    assert!(!is_safe("reboot"));
    assert!(!is_safe("systemctl stop nginx"));
    assert!(!is_safe("apt install cowsay"));
    assert!(!is_safe("docker run alpine"));
    assert!(!is_safe("killall -9 nginx"));
    assert!(!is_safe("crontab -l"));
    assert!(!is_safe("nc -l 4444"));
    assert!(!is_safe("scp f host:/tmp"));
}

#[test]
fn test_deny_applies_in_any_pipeline_position() {
    assert!(!is_safe("cat /etc/passwd | ssh host tee x"));
    assert!(!is_safe("ls && rm -rf /tmp/x"));
}

#[test]
fn test_restricted_rules() {
    assert!(is_safe("sed -n 1,10p /var/log/syslog"));
    assert!(vet("sed -i s/a/b/ f").unwrap_err().contains("sed"));
    assert!(!is_safe("awk 'BEGIN{system(\"id\")}'"));
    assert!(is_safe("awk '{print $2}' /proc/meminfo"));
    assert!(!is_safe("curl -X POST http://api"));
    assert!(!is_safe("curl -o /tmp/payload http://host"));
    assert!(is_safe("curl -sI http://localhost:8080"));
    assert!(!is_safe("wget --post-data='x=1' http://host"));
    assert!(is_safe("ls | tee /dev/null"));
    assert!(!is_safe("ls | tee /etc/passwd"));
    assert!(is_safe("sleep 3"));
    assert!(!is_safe("sleep 60"));
}

#[test]
fn test_combo_commands_positional() {
    assert!(vet("xargs ls").unwrap_err().contains("combo"));
    assert!(!is_safe("parallel echo ::: 1 2"));
    assert!(is_safe("find . -name '*.go' | xargs ls"));
    assert!(is_safe("find . -name '*.go' | xargs wc -l"));
    assert!(!is_safe("find . -name '*' | xargs rm"));
}

#[test]
fn test_unknown_commands_rejected_by_default() {
    assert!(vet("make deploy").unwrap_err().contains("not in allow list"));
    assert!(!is_safe("python3 -c 'print(1)'"));
    assert!(!is_safe("bash script.sh"));
}

#[test]
fn test_rejection_reason_names_the_culprit() {
    let reason = vet("rm -rf /").unwrap_err();
    assert!(reason.contains("rm"), "reason should mention rm: {reason}");

    let reason = vet("echo $(whoami)").unwrap_err();
    assert!(
        reason.contains("substitution"),
        "reason should name the pattern: {reason}"
    );
}
