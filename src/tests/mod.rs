use serde_json::json;
use yare::parameterized;

use crate::types::{NOECHO_WITH_DEFAULT, RequestContext, Value};
use crate::{ResolverConfig, Template, load_template};


const BUCKET_TEMPLATE: &str = r#"{
    "Parameters": {
        "Env": {"Type": "String", "Default": "dev", "AllowedValues": ["dev", "prod"]},
        "DbPassword": {"Type": "String", "NoEcho": true, "Default": "hunter2"},
        "Subnets": {"Type": "CommaDelimitedList", "Default": "subnet-a, subnet-b"}
    },
    "Mappings": {
        "RegionMap": {"eu-west-1": {"Ami": "ami-eu"}, "us-east-1": {"Ami": "ami-us"}}
    },
    "Conditions": {
        "IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
        "IsDev": {"Fn::Not": [{"Condition": "IsProd"}]}
    },
    "Resources": {
        "Logs": {
            "Type": "AWS::S3::Bucket",
            "Properties": {
                "BucketName": {"Fn::Sub": "${AWS::StackName}-${Env}-logs"},
                "Tags": [
                    {"Key": "env", "Value": {"Ref": "Env"}},
                    {"Fn::If": ["IsProd", {"Key": "tier", "Value": "gold"}, {"Ref": "AWS::NoValue"}]}
                ]
            }
        },
        "Replica": {
            "Type": "AWS::S3::Bucket",
            "Condition": "IsProd",
            "Properties": {"BucketName": {"Fn::Join": ["-", [{"Ref": "Env"}, "replica"]]}}
        },
        "Host": {
            "Type": "AWS::EC2::Instance",
            "Properties": {
                "ImageId": {"Fn::FindInMap": ["RegionMap", {"Ref": "AWS::Region"}, "Ami"]},
                "SubnetId": {"Fn::Select": [1, {"Ref": "Subnets"}]},
                "UserData": {"Fn::Base64": {"Fn::Sub": "password=${DbPassword}"}},
                "AvailabilityZone": {"Fn::Select": [0, {"Fn::GetAZs": ""}]}
            }
        }
    },
    "Outputs": {
        "ReplicaName": {"Condition": "IsProd", "Value": {"Ref": "Replica"}},
        "HostAz": {"Value": {"Fn::GetAtt": ["Host", "AvailabilityZone"]}}
    }
}"#;

fn bucket_template() -> Template {
    load_template(BUCKET_TEMPLATE).unwrap()
}

#[parameterized(
    default_env = { None, false },
    prod_env = { Some("prod"), true },
)]
fn test_condition_decides_resource_presence(env: Option<&str>, replica_present: bool) {
    let mut builder = ResolverConfig::builder();
    if let Some(env) = env {
        builder = builder.with_parameter_override("Env", env);
    }
    let resolved = bucket_template().resolve(&builder.build()).unwrap();

    assert_eq!(resolved.conditions["IsProd"], replica_present);
    assert_eq!(resolved.conditions["IsDev"], !replica_present);
    assert_eq!(resolved.resources.contains_key("Replica"), replica_present);
    assert_eq!(resolved.outputs.contains_key("ReplicaName"), replica_present);
    if replica_present {
        assert_eq!(
            resolved.resources["Replica"],
            Value::from(json!({
                "Type": "AWS::S3::Bucket",
                "Condition": "IsProd",
                "Properties": {"BucketName": "prod-replica"}
            }))
        );
    }
}

#[test]
fn test_resolved_template_has_no_functions() {
    let resolved = bucket_template().resolve(&ResolverConfig::default()).unwrap();
    insta::assert_json_snapshot!(resolved, @r#"
    {
      "Conditions": {
        "IsProd": false,
        "IsDev": true
      },
      "Resources": {
        "Logs": {
          "Properties": {
            "BucketName": "stack-name-dev-logs",
            "Tags": [
              {
                "Key": "env",
                "Value": "dev"
              }
            ]
          },
          "Type": "AWS::S3::Bucket"
        },
        "Host": {
          "Properties": {
            "AvailabilityZone": "GETAZS",
            "ImageId": "ami-eu",
            "SubnetId": "subnet-b",
            "UserData": "cGFzc3dvcmQ9Tk9FQ0hPX1dJVEhfREVGQVVMVA=="
          },
          "Type": "AWS::EC2::Instance"
        }
      },
      "Outputs": {
        "HostAz": {
          "Value": "GETATT"
        }
      }
    }
    "#);
}

#[test]
fn test_no_echo_value_never_leaks() {
    let config = ResolverConfig::builder()
        .with_parameter_override("DbPassword", "s3cr3t")
        .build();
    let resolved = bucket_template().resolve(&config).unwrap();
    let rendered = serde_json::to_string(&resolved).unwrap();

    assert!(!rendered.contains("s3cr3t"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn test_no_echo_default_sentinel() {
    let template = load_template(
        r#"{
            "Parameters": {"Secret": {"Type": "String", "NoEcho": true, "Default": "x"}},
            "Resources": {"Q": {"Type": "AWS::SQS::Queue", "Properties": {"QueueName": {"Ref": "Secret"}}}}
        }"#,
    )
    .unwrap();
    let resolved = template.resolve(&ResolverConfig::default()).unwrap();
    assert_eq!(
        resolved.resources["Q"].as_map().and_then(|r| r.get("Properties")),
        Some(&Value::from(json!({"QueueName": NOECHO_WITH_DEFAULT})))
    );
}

#[test]
fn test_pseudo_parameter_override() {
    let config = ResolverConfig::builder()
        .with_parameter_override("AWS::Region", "us-east-1")
        .build();
    let resolved = bucket_template().resolve(&config).unwrap();
    let image = resolved.resources["Host"]
        .as_map()
        .and_then(|r| r.get("Properties"))
        .and_then(Value::as_map)
        .and_then(|p| p.get("ImageId"))
        .cloned();
    assert_eq!(image, Some(Value::from("ami-us")));
}

#[test]
fn test_non_boolean_condition_aborts_resolution() {
    let template = load_template(
        r#"{
            "Conditions": {"Broken": {"Fn::Join": ["", ["tr", "ue"]]}},
            "Resources": {}
        }"#,
    )
    .unwrap();
    assert!(matches!(
        template.resolve(&ResolverConfig::default()),
        Err(crate::EngineError::InvalidBooleanCoercion { .. })
    ));
}

#[test]
fn test_resolved_condition_compiles() {
    let template = load_template(
        r#"{
            "Parameters": {"Office": {"Type": "String", "Default": "203.0.113.0/24"}},
            "Resources": {
                "Policy": {
                    "Type": "AWS::IAM::ManagedPolicy",
                    "Properties": {
                        "PolicyDocument": {
                            "Statement": [{
                                "Effect": "Allow",
                                "Action": "s3:GetObject",
                                "Resource": "*",
                                "Condition": {"IpAddress": {"aws:SourceIp": {"Ref": "Office"}}}
                            }]
                        }
                    }
                }
            }
        }"#,
    )
    .unwrap();

    let raw = template.resources["Policy"]
        .get("Properties")
        .and_then(|p| p.get("PolicyDocument"))
        .cloned()
        .unwrap();
    let unresolved = crate::types::PolicyDocument::from_node(&raw).unwrap();
    let condition = unresolved.statements[0].statement_condition().unwrap().unwrap();
    assert!(condition.compile().is_err());

    let resolved = template.resolve(&ResolverConfig::default()).unwrap();
    let (logical_id, document) = resolved.policy_documents().remove(0);
    assert_eq!(logical_id, "Policy");

    let compiled = document.statements[0]
        .statement_condition()
        .unwrap()
        .unwrap()
        .compile()
        .unwrap();
    assert!(compiled.evaluate(&RequestContext::new().with_attr("aws:SourceIp", "203.0.113.9")));
    assert!(!compiled.evaluate(&RequestContext::new().with_attr("aws:SourceIp", "198.51.100.1")));
}
