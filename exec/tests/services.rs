mod common;

use std::time::Duration;

use rosacli_core::{CommandArgs, OutputFormat};
use rosacli_exec::{Completion, ExecError, ResourceKind};

use common::{Scripted, client, ok};

#[test]
fn test_machine_pool_lifecycle_commands() {
    let executor = Scripted::replying([
        Completion::exited(0, "INFO: Machine pool 'mp-ci' created successfully on cluster 'c-1'\n"),
        ok("machinepool-list.txt"),
        ok("machinepool-describe.txt"),
        Completion::exited(0, ""),
        Completion::exited(0, "INFO: Successfully deleted machine pool 'mp-ci'\n"),
    ]);
    let mut client = client(&executor);

    client
        .machine_pool()
        .create("c-1", "mp-ci", &["--replicas", "2", "--labels", "env=ci"])
        .unwrap();
    assert_eq!(client.ledger().len(), 1);

    let pools = client.machine_pool().list_and_reflect("c-1").unwrap();
    assert_eq!(pools.len(), 2);
    let spot = pools.machine_pool("mp-spot").unwrap();
    assert_eq!(spot.replicas, "1-3");
    assert_eq!(spot.subnets, "subnet-0a, subnet-0b");
    assert!(pools.machine_pool("mp-ci").is_none());

    let description = client.machine_pool().describe_and_reflect("c-1", "mp-ci").unwrap();
    assert_eq!(description.id, "mp-ci");
    assert_eq!(description.labels, "env=ci");
    assert_eq!(description.taints, "");
    assert_eq!(description.disk_size, "300 GiB");

    client
        .machine_pool()
        .edit("c-1", "mp-ci", &["--replicas", "3"])
        .unwrap();
    client.machine_pool().delete("c-1", "mp-ci", &[]).unwrap();
    assert!(client.ledger().is_empty());

    assert_eq!(
        executor.command_lines(),
        [
            "create machinepool --replicas 2 --labels env=ci -c c-1 --name mp-ci",
            "list machinepool -c c-1",
            "describe machinepool mp-ci -c c-1",
            "edit machinepool mp-ci --replicas 3 -c c-1",
            "delete machinepool -c c-1 mp-ci -y",
        ]
    );
}

#[test]
fn test_failed_create_is_not_recorded() {
    let executor = Scripted::replying([Completion::exited(
        1,
        "ERR: Failed to add machine pool to cluster 'c-1': instance type not supported\n",
    )]);
    let mut client = client(&executor);
    let err = client
        .machine_pool()
        .create("c-1", "mp-ci", &["--instance-type", "x1.tiny"])
        .unwrap_err();
    assert_eq!(err.exit_code(), Some(1));
    assert!(client.ledger().is_empty());
}

#[test]
fn test_clean_resources_continues_past_failures() {
    let executor = Scripted::replying([
        Completion::exited(0, ""),
        Completion::exited(0, ""),
        Completion::exited(0, ""),
        // Cleanup: first delete fails, second succeeds, then account roles.
        Completion::exited(1, "ERR: Machine pool 'mp-a' does not exist\n"),
        Completion::exited(0, ""),
        Completion::exited(0, ""),
    ]);
    let mut client = client(&executor);
    client.machine_pool().create("c-1", "mp-a", &[]).unwrap();
    client.machine_pool().create("c-1", "mp-b", &[]).unwrap();
    client
        .ocm_resource()
        .create_account_role(&["--prefix", "ci", "--mode", "auto", "-y"])
        .unwrap();
    assert_eq!(client.ledger().len(), 3);

    let err = client.clean_resources("c-1").unwrap_err();
    match err {
        ExecError::Cleanup(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].exit_code(), Some(1));
        }
        other => panic!("unexpected error: {other}"),
    }

    let lines = executor.command_lines();
    assert_eq!(lines[3], "delete machinepool -c c-1 mp-a -y");
    assert_eq!(lines[4], "delete machinepool -c c-1 mp-b -y");
    assert_eq!(lines[5], "delete account-roles --prefix ci --mode auto -y");

    let pending: Vec<_> = client.ledger().iter().map(|r| (r.kind, r.name.clone())).collect();
    assert_eq!(pending, [(ResourceKind::MachinePool, "mp-a".to_string())]);
}

#[test]
fn test_clean_resources_with_nothing_recorded() {
    let executor = Scripted::replying([]);
    let mut client = client(&executor);
    client.clean_resources("c-1").unwrap();
    assert!(executor.seen().is_empty());
}

#[test]
fn test_cluster_description_reflection() {
    let executor = Scripted::replying([ok("cluster-describe.txt")]);
    let mut client = client(&executor);
    let description = client.cluster().describe_and_reflect("demo").unwrap();

    assert_eq!(executor.command_lines(), ["describe cluster -c demo"]);
    assert_eq!(description.name, "demo");
    assert_eq!(description.state, "ready");
    assert_eq!(description.console_url, "");
    assert_eq!(description.ec2_metadata_http_tokens, "optional");
    assert_eq!(description.network_value("Machine CIDR"), Some("10.0.0.0/16"));
    assert_eq!(description.availability.len(), 2);
    assert_eq!(description.instance_iam_roles.len(), 1);
    assert_eq!(description.operator_iam_roles.len(), 2);
    assert!(description.operator_iam_roles[0].ends_with("kube-controller-manager"));
    assert_eq!(description.user_workload_monitoring, "Enabled");
    assert_eq!(
        description.failed_inflight_checks,
        "Egress check failed: api.openshift.com:443 unreachable\nnot found: Role name 'demo-missing'"
    );
    assert_eq!(description.audit_log_forwarding, "Disabled");
    assert_eq!(description.proxy, Vec::new());
}

#[test]
fn test_cluster_list_and_create_dry_run() {
    let executor = Scripted::replying([
        ok("cluster-list.txt"),
        Completion::exited(0, "INFO: Creating cluster 'demo' should succeed.\n"),
    ]);
    let mut client = client(&executor);

    let clusters = client.cluster().list_and_reflect().unwrap();
    assert_eq!(clusters.clusters.len(), 2);
    assert_eq!(clusters.cluster_by_name("classic-ci").unwrap().state, "installing");
    assert_eq!(clusters.cluster_by_name("demo").unwrap().topology, "Hosted CP");
    assert!(clusters.contains("2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d"));
    assert!(!clusters.contains("missing"));

    let output = client
        .cluster()
        .create_dry_run("demo", &["--sts", "--mode", "auto"])
        .unwrap();
    assert!(output.contains("should succeed"));
    assert_eq!(
        executor.command_lines()[1],
        "create cluster -c demo --dry-run --sts --mode auto"
    );
}

#[test]
fn test_cluster_json_description_restores_format() {
    let executor = Scripted::replying([
        ok("cluster-describe.json"),
        ok("cluster-describe.json"),
        ok("cluster-describe.json"),
    ]);
    let mut client = client(&executor);
    client.runner_mut().yaml_format();

    assert!(client.cluster().is_hosted_cp("demo").unwrap());
    assert!(client.cluster().is_sts("demo").unwrap());
    assert!(client.cluster().is_private("demo").unwrap());
    assert_eq!(client.runner().format(), OutputFormat::Yaml);

    for line in executor.command_lines() {
        assert_eq!(line, "describe cluster --output json -c demo");
    }
}

#[test]
fn test_cluster_json_description_restores_format_on_failure() {
    let executor = Scripted::replying([Completion::exited(1, "ERR: no such cluster\n")]);
    let mut client = client(&executor);
    assert!(client.cluster().json_description("nope").is_err());
    assert_eq!(client.runner().format(), OutputFormat::Text);
}

#[test]
fn test_wait_for_state() {
    let installing = "ID   NAME  STATE       TOPOLOGY\nc-1  demo  installing  Classic\n";
    let ready = "ID   NAME  STATE  TOPOLOGY\nc-1  demo  ready  Classic\n";
    let executor = Scripted::replying([
        Completion::exited(0, installing),
        Completion::exited(0, ready),
    ]);
    let mut client = client(&executor);
    let reached = client
        .cluster()
        .wait_for_state("c-1", "ready", Duration::ZERO, Duration::from_secs(60))
        .unwrap();
    assert!(reached);
    assert_eq!(executor.seen().len(), 2);
}

#[test]
fn test_wait_for_state_gives_up() {
    let installing = "ID   NAME  STATE       TOPOLOGY\nc-1  demo  installing  Classic\n";
    let executor = Scripted::replying([Completion::exited(0, installing)]);
    let mut client = client(&executor);
    let reached = client
        .cluster()
        .wait_for_state("c-1", "ready", Duration::ZERO, Duration::ZERO)
        .unwrap();
    assert!(!reached);
}

#[test]
fn test_version_listing() {
    let executor = Scripted::replying([ok("version-list.txt"), ok("versions.json")]);
    let mut client = client(&executor);

    let versions = client
        .version()
        .list_and_reflect("stable", true, &[])
        .unwrap();
    assert_eq!(versions.len(), 4);
    assert_eq!(versions.default_version().unwrap().version, "4.15.3");
    let nearest = versions
        .find_nearest_backward_minor("4.15.3", 1, true, true)
        .unwrap()
        .unwrap();
    assert_eq!(nearest.version, "4.14.12");

    let json = client
        .version()
        .list_and_reflect_json("", false, &[])
        .unwrap();
    assert_eq!(json.len(), 2);
    assert!(json[0].default);
    assert_eq!(json[1].raw_id, "4.14.12");
    assert_eq!(json[1].available_upgrades, ["4.14.13", "4.15.3"]);
    assert!(!json[1].hosted_control_plane_default);

    assert_eq!(
        executor.command_lines(),
        [
            "list versions --hosted-cp --channel-group stable",
            "list versions -o json",
        ]
    );
}

#[test]
fn test_whoami_reflection() {
    let executor = Scripted::replying([ok("whoami.txt")]);
    let mut client = client(&executor);
    let info = client.ocm_resource().user_info().unwrap();
    assert_eq!(info.aws_account_id, "123456789012");
    assert_eq!(info.ocm_account_username, "ci-bot");
    assert_eq!(info.ocm_organization_external_id, "1234567");
    assert_eq!(info.ocm_api, "https://api.openshift.com");
}

#[test]
fn test_oidc_config_lookup() {
    let executor = Scripted::replying([ok("oidc-config-list.txt"), ok("oidc-config-list.txt")]);
    let mut client = client(&executor);

    let (configs, _) = client.ocm_resource().list_oidc_configs().unwrap();
    assert_eq!(configs.oidc_configs.len(), 2);
    let unmanaged = configs.oidc_config("2bcdefghijklmnopqrstuvwxyz012345").unwrap();
    assert_eq!(unmanaged.managed, "false");
    assert!(unmanaged.secret_arn.starts_with("arn:aws:secretsmanager"));
    assert_eq!(configs.oidc_configs[0].secret_arn, "");

    let id = client
        .ocm_resource()
        .oidc_config_id("ci-oidc.s3.us-east-1.amazonaws.com")
        .unwrap();
    assert_eq!(id, "2bcdefghijklmnopqrstuvwxyz012345");
}

#[test]
fn test_account_role_create_and_delete_track_prefix() {
    let executor = Scripted::replying([]);
    let mut client = client(&executor);
    client
        .ocm_resource()
        .create_account_role(&["--prefix", "ci", "--mode", "auto", "-y"])
        .unwrap();
    assert_eq!(client.ledger().len(), 1);
    client
        .ocm_resource()
        .delete_account_role(&["--prefix=ci", "--mode", "auto", "-y"])
        .unwrap();
    assert!(client.ledger().is_empty());
    assert_eq!(
        executor.command_lines()[0],
        "create account-roles --prefix ci --mode auto -y"
    );
}

#[test]
fn test_manual_mode_commands_run_as_pipeline() {
    let manual = "INFO: Run the following commands to create the operator roles:\n\n\
                  aws iam create-role \\\n\t--role-name demo-ingress \\\n\t--path /\n";
    let executor = Scripted::replying([
        Completion::exited(0, manual),
        Completion::exited(0, "WARN: dry run\n{\"Role\": {\"RoleName\": \"demo-ingress\"}}\n"),
    ]);
    let client = client(&executor);

    let output = client
        .runner()
        .run(["create", "operator-roles", "--mode", "manual", "-c", "c-1"])
        .unwrap();
    let commands = rosacli_parser::extract_aws_commands(&output.to_text());
    assert_eq!(commands.len(), 1);

    let pipeline = [commands[0].clone(), CommandArgs::parse("jq -c .Role")];
    let result = client.runner().run_pipeline(&pipeline).unwrap();
    assert!(result.contains("demo-ingress"));

    let seen = executor.seen();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1].program, "aws");
    assert_eq!(seen[1].args, ["iam", "create-role", "--role-name", "demo-ingress", "--path", "/"]);
    assert_eq!(seen[2].program, "jq");
    assert!(seen.iter().all(|stage| stage.dir.as_deref() == Some(std::path::Path::new("/work"))));
}

#[test]
fn test_failed_pipeline_keeps_output() {
    let executor = Scripted::replying([Completion::exited(2, "grep: bad pattern\n")]);
    let client = client(&executor);
    let pipeline = [CommandArgs::parse("rosa list clusters"), CommandArgs::parse("grep [")];
    let err = client.runner().run_pipeline(&pipeline).unwrap_err();
    assert_eq!(err.exit_code(), Some(2));
    assert!(err.output().unwrap().contains("bad pattern"));
    assert!(client.runner().run_pipeline(&[]).is_err());
}
