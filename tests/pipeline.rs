mod common;

use std::path::PathBuf;

use common::{Call, Probe, ScriptedRemote};
use dockhand::compose::Descriptor;
use dockhand::config::PROXY_CONFIG_PATH;
use dockhand::error::DeployError;
use dockhand::stage::StagedRepo;
use dockhand::{DeploymentConfig, Pipeline, SshTarget, pipeline};

const RUNNING: &str = r#"{"Status":"running","Running":true,"Pid":4242}"#;

fn config() -> DeploymentConfig {
    DeploymentConfig::new(
        "https://github.com/segun/hello-node.git",
        SshTarget::new("root", "10.0.0.5"),
        3000,
    )
}

fn staged(descriptor: Descriptor) -> StagedRepo {
    StagedRepo {
        name: "hello-node".to_string(),
        path: PathBuf::from("/work/hello-node"),
        descriptor,
    }
}

fn healthy_host() -> ScriptedRemote {
    ScriptedRemote::new(&Probe::ready())
        .on("curl", "200")
        .on("docker inspect", RUNNING)
}

#[test]
fn single_container_deploys_in_order() {
    let remote = healthy_host();

    let report = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .expect("deployment should succeed");

    assert_eq!(report.app_status, Some(200));
    assert_eq!(report.container_running, Some(true));
    assert!(!report.nginx_restarted);

    let mkdir = remote.position("mkdir -p 'app_deploy'").unwrap();
    let build = remote.position("docker build -t 'hello-node:latest' 'app_deploy'").unwrap();
    let run = remote
        .position("docker run -d --name 'hello-node' --restart unless-stopped -p 127.0.0.1:3000:3000")
        .unwrap();
    let proxy = remote.write_position(PROXY_CONFIG_PATH).unwrap();
    let check = remote.position("nginx -t").unwrap();
    let restart = remote.position("systemctl restart nginx").unwrap();
    let probe = remote.position("curl").unwrap();

    assert!(mkdir < build);
    assert!(build < run);
    assert!(run < proxy);
    assert!(proxy < check);
    assert!(check < restart);
    assert!(restart < probe);

    assert!(!remote.ran("apt-get install"));
    assert!(!remote.ran("rm -rf"));
}

#[test]
fn working_copy_is_synced_without_git_metadata() {
    let remote = healthy_host();

    Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap();

    let sync = remote
        .calls()
        .into_iter()
        .find(|c| matches!(c, Call::Sync { .. }))
        .expect("working copy should be synced");
    assert_eq!(
        sync,
        Call::Sync {
            local: PathBuf::from("/work/hello-node"),
            remote_dir: "app_deploy".to_string(),
            excludes: vec![".git".to_string()],
            delete: false,
        }
    );
}

#[test]
fn mirror_deletions_is_passed_to_the_sync() {
    let remote = healthy_host();

    Pipeline::new(config().mirror_deletions(true))
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap();

    assert!(
        remote
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Sync { delete: true, .. }))
    );
}

#[test]
fn proxy_config_forwards_to_the_app_port() {
    let remote = healthy_host();

    Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap();

    let written = remote.written(PROXY_CONFIG_PATH).unwrap();
    assert!(written.contains("listen 80;"));
    assert!(written.contains("proxy_pass http://127.0.0.1:3000;"));
    assert!(remote.calls().iter().any(|c| matches!(
        c,
        Call::Write { path, privileged: true, .. } if path == PROXY_CONFIG_PATH
    )));
}

#[test]
fn previous_container_is_replaced() {
    let probe = Probe {
        container: true,
        running: 1,
        ..Probe::ready()
    };
    let remote = ScriptedRemote::new(&probe).on("curl", "200");

    Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap();

    let stop = remote.position("--filter ancestor='hello-node:latest'").unwrap();
    let build = remote.position("docker build").unwrap();
    let remove = remote.position("docker rm -f 'hello-node'").unwrap();
    let run = remote.position("docker run -d").unwrap();
    assert!(stop < build);
    assert!(build < remove);
    assert!(remove < run);
}

#[test]
fn compose_stack_is_rebuilt() {
    let remote = healthy_host();

    let report = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Compose("compose.yaml".into())), &remote)
        .unwrap();

    let down = remote
        .position("cd 'app_deploy' && docker compose -f 'compose.yaml' down --remove-orphans")
        .unwrap();
    let up = remote.position("docker compose -f 'compose.yaml' up -d --build").unwrap();
    assert!(down < up);
    assert!(!remote.ran("docker run"));
    assert!(!remote.ran("docker inspect"));
    assert_eq!(report.container_running, None);
}

#[test]
fn second_run_converges_to_the_same_state() {
    let first = healthy_host();
    let already_deployed = Probe {
        container: true,
        running: 1,
        proxy_conf: true,
        deploy_dir: true,
        ..Probe::ready()
    };
    let second = ScriptedRemote::new(&already_deployed)
        .on("curl", "200")
        .on("docker inspect", RUNNING);

    let a = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &first)
        .unwrap();
    let b = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &second)
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(first.written(PROXY_CONFIG_PATH), second.written(PROXY_CONFIG_PATH));
    let runs = |r: &ScriptedRemote| r.commands().iter().filter(|c| c.contains("docker run")).count();
    assert_eq!(runs(&first), 1);
    assert_eq!(runs(&second), 1);
    assert!(!first.ran("docker rm -f"));
    assert!(second.ran("docker rm -f 'hello-node'"));
}

#[test]
fn unreachable_host_touches_nothing() {
    let remote = healthy_host().unreachable();

    let err = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap_err();

    assert!(matches!(err, DeployError::SshFailed(_)));
    assert!(err.is_precondition());
    assert!(remote.calls().is_empty());
}

#[test]
fn dangerous_remote_dir_touches_nothing() {
    for dir in ["/", "~", "..", "app/../.."] {
        let remote = healthy_host();

        let err = Pipeline::new(config().remote_dir(dir))
            .deploy_to(&staged(Descriptor::Dockerfile), &remote)
            .unwrap_err();

        assert!(matches!(err, DeployError::Config(_)), "{dir:?}");
        assert!(remote.calls().is_empty(), "{dir:?}");
    }
}

#[test]
fn dangerous_remote_dir_is_refused_before_staging() {
    let workspace = tempfile::tempdir().unwrap();

    let err = Pipeline::new(config().remote_dir("/").workspace(workspace.path()))
        .run()
        .unwrap_err();

    assert!(matches!(err, DeployError::Config(_)));
    assert!(!workspace.path().join("hello-node").exists());
}

#[test]
fn provisioned_host_without_package_manager_deploys() {
    let probe = Probe {
        pkg: "none",
        ..Probe::ready()
    };
    let remote = ScriptedRemote::new(&probe)
        .on("curl", "200")
        .on("docker inspect", RUNNING);

    Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .expect("nothing needs installing");

    assert!(remote.ran("docker run -d"));
    assert!(!remote.ran("rm -rf"));
}

#[test]
fn failed_build_triggers_cleanup() {
    let remote = healthy_host().fail_on("docker build");

    let err = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap_err();

    assert!(matches!(err, DeployError::Other(_)));
    assert!(!remote.ran("docker run"));
    assert!(remote.written(PROXY_CONFIG_PATH).is_none());

    let build = remote.position("docker build").unwrap();
    let prune = remote.position("docker container prune -f").unwrap();
    let rm_dir = remote.position("rm -rf 'app_deploy'").unwrap();
    let rm_conf = remote.position(&format!("rm -f {PROXY_CONFIG_PATH}")).unwrap();
    assert!(build < prune);
    assert!(prune < rm_dir);
    assert!(rm_dir < rm_conf);
}

#[test]
fn rejected_proxy_config_is_never_served() {
    let remote = healthy_host().fail_on("nginx -t 2>&1");

    let err = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap_err();

    assert!(matches!(err, DeployError::ProxyConfigInvalid(_)));
    assert!(!remote.ran("systemctl restart nginx"));
    assert!(remote.ran(&format!("rm -f {PROXY_CONFIG_PATH}")));
}

#[test]
fn silent_app_is_a_warning_not_a_failure() {
    let remote = ScriptedRemote::new(&Probe::ready()).on("curl", "000");

    let report = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .expect("an unanswered probe must not fail the run");

    assert_eq!(report.app_status, None);
    assert!(!report.app_ok());
    assert!(!remote.ran("rm -rf"));
}

#[test]
fn server_error_from_app_is_reported() {
    let remote = ScriptedRemote::new(&Probe::ready()).on("curl", "502");

    let report = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap();

    assert_eq!(report.app_status, Some(502));
    assert!(!report.app_ok());
}

#[test]
fn inactive_docker_fails_validation_and_cleans_up() {
    let docker_down = Probe {
        active: false,
        ..Probe::ready()
    };
    let remote = healthy_host().probes(&[Probe::ready(), Probe::ready(), docker_down]);

    let err = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap_err();

    assert!(matches!(err, DeployError::ServiceInactive(ref s) if s == "docker"));
    assert!(remote.ran("rm -rf 'app_deploy'"));
}

#[test]
fn inactive_nginx_is_restarted_once() {
    let nginx_down = Probe {
        nginx_active: false,
        ..Probe::ready()
    };
    let remote = healthy_host()
        .probes(&[Probe::ready(), Probe::ready(), nginx_down])
        .on("is-active --quiet nginx && echo active", "active");

    let report = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap();

    assert!(report.nginx_restarted);
}

#[test]
fn nginx_that_stays_down_fails_validation() {
    let nginx_down = Probe {
        nginx_active: false,
        ..Probe::ready()
    };
    let remote = healthy_host()
        .probes(&[Probe::ready(), Probe::ready(), nginx_down])
        .on("is-active --quiet nginx && echo active", "inactive");

    let err = Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap_err();

    assert!(matches!(err, DeployError::ServiceInactive(ref s) if s == "nginx"));
}

#[test]
fn fresh_host_is_bootstrapped_first() {
    let remote = healthy_host().probes(&[Probe::fresh(), Probe::ready()]);

    Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap();

    let install = remote
        .position("apt-get install -y docker.io docker-compose-v2 nginx")
        .unwrap();
    let sync = remote
        .calls()
        .iter()
        .position(|c| matches!(c, Call::Sync { .. }))
        .unwrap();
    assert!(install < sync);
}

#[test]
fn non_root_user_gets_sudo() {
    let remote = healthy_host().non_root();

    Pipeline::new(config())
        .deploy_to(&staged(Descriptor::Dockerfile), &remote)
        .unwrap();

    assert!(remote.ran("sudo -n docker build"));
    assert!(remote.ran("sudo -n systemctl restart nginx"));
    assert!(remote.ran("sudo -n usermod -aG docker"));
}

#[test]
fn status_reports_snapshot() {
    let probe = Probe {
        running: 2,
        proxy_conf: true,
        deploy_dir: true,
        ..Probe::ready()
    };
    let remote = ScriptedRemote::new(&probe).on("docker ps --format", "NAMES");

    let state = pipeline::run_status(&remote, "app_deploy").unwrap();

    assert!(state.is_provisioned());
    assert_eq!(state.running_containers, 2);
    assert!(state.proxy_config);
    assert!(remote.ran("docker ps --format"));
    assert!(!remote.ran("rm "));
}

#[test]
fn status_on_unreachable_host_fails() {
    let remote = ScriptedRemote::new(&Probe::ready()).unreachable();

    let err = pipeline::run_status(&remote, "app_deploy").unwrap_err();

    assert!(matches!(err, DeployError::SshFailed(_)));
}
