//! Integration tests for the Spotinst provider using wiremock
//!
//! Each test drives the provider through the `Provider` trait against a mock
//! API server and checks the requests it sends and the state it returns.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use spotform_core::provider::Provider;
use spotform_core::resource::{Resource, ResourceId, State, Value};
use spotform_core::retry::RetryPolicy;
use spotform_provider_spotinst::{Config, SpotinstProvider};
use wiremock::matchers::{bearer_token, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const TOKEN: &str = "test-token";
const ACCOUNT: &str = "act-12345";

fn provider(server: &MockServer) -> SpotinstProvider {
    let config = Config::new(TOKEN)
        .with_account(ACCOUNT)
        .with_base_url(server.uri())
        .with_retry(RetryPolicy {
            timeout: Duration::from_secs(5),
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
        });
    SpotinstProvider::new(&config).expect("provider should build")
}

fn items(items: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "request": {"id": "req-1"},
        "response": {"status": {"code": 200}, "items": items}
    }))
}

fn errors(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "response": {"errors": [{"code": code, "message": message}]}
    }))
}

fn group() -> Resource {
    Resource::new("spotinst_elastigroup_aws", "web")
        .with_attribute("name", "eg-test")
        .with_attribute("description", "created by tests")
        .with_attribute("product", "Linux/UNIX")
        .with_attribute("min_size", 0i64)
        .with_attribute("max_size", 0i64)
}

fn group_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "eg-test",
        "description": "created by tests",
        "capacity": {"minimum": 0, "maximum": 0, "target": 0},
        "compute": {"product": "Linux/UNIX"}
    })
}

fn health_check(interval: i64) -> Resource {
    let mut check = HashMap::new();
    check.insert("protocol".to_string(), Value::from("http"));
    check.insert("port".to_string(), Value::Int(80));
    check.insert("interval".to_string(), Value::Int(interval));
    check.insert("timeout".to_string(), Value::Int(5));

    Resource::new("spotinst_health_check", "web")
        .with_attribute("resource_id", "sig-1")
        .with_attribute("proxy_address", "http://proxy.example.com")
        .with_attribute("check", Value::List(vec![Value::Map(check)]))
}

/// Tests for the create path
mod create_tests {
    use super::*;

    /// Create posts the wrapped object, then reads it back into state
    #[tokio::test]
    async fn test_create_then_read_populates_state() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/aws/ec2/group"))
            .and(bearer_token(TOKEN))
            .and(query_param("accountId", ACCOUNT))
            .and(body_partial_json(json!({
                "group": {
                    "name": "eg-test",
                    "capacity": {"minimum": 0, "maximum": 0},
                    "compute": {"product": "Linux/UNIX"}
                }
            })))
            .respond_with(items(json!([{"id": "sig-1", "name": "eg-test"}])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-1"))
            .and(query_param("accountId", ACCOUNT))
            .respond_with(items(json!([group_json("sig-1")])))
            .expect(1)
            .mount(&server)
            .await;

        let state = provider(&server)
            .create(&group())
            .await
            .expect("create should succeed");

        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("sig-1"));
        assert_eq!(state.attributes["name"], Value::from("eg-test"));
        assert_eq!(state.attributes["min_size"], Value::Int(0));
        assert_eq!(state.attributes["desired_capacity"], Value::Int(0));
    }

    /// A not-yet-visible IAM instance profile is retried until it succeeds
    #[tokio::test]
    async fn test_iam_profile_error_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/aws/ec2/group"))
            .respond_with(errors(
                400,
                "InvalidParameterValue",
                "Invalid IAM Instance Profile name: role-web",
            ))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/aws/ec2/group"))
            .respond_with(items(json!([{"id": "sig-2"}])))
            .expect(1)
            .with_priority(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-2"))
            .respond_with(items(json!([group_json("sig-2")])))
            .mount(&server)
            .await;

        let state = provider(&server)
            .create(&group())
            .await
            .expect("create should succeed after retries");

        assert_eq!(state.identifier.as_deref(), Some("sig-2"));
    }

    /// Other API errors fail the create on the first attempt
    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/aws/ec2/group"))
            .respond_with(errors(400, "ValidationError", "capacity is invalid"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server)
            .create(&group())
            .await
            .expect_err("create should fail");

        assert!(err.to_string().contains("failed to create group"));
        let cause = std::error::Error::source(&err).expect("error should carry its cause");
        assert!(cause.to_string().contains("ValidationError: capacity is invalid"));
    }

    /// Attributes failing schema validation never reach the API
    #[tokio::test]
    async fn test_invalid_attributes_send_no_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(items(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let resource = Resource::new("spotinst_elastigroup_aws", "web")
            .with_attribute("name", "eg-test")
            .with_attribute("min_size", -1i64);

        let err = provider(&server)
            .create(&resource)
            .await
            .expect_err("validation should fail");
        assert!(err.to_string().contains("invalid attributes"));
    }
}

/// Tests for the read path
mod read_tests {
    use super::*;

    /// A missing object yields a not-found state instead of an error
    #[tokio::test]
    async fn test_not_found_code_clears_state() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/healthCheck/hc-gone"))
            .respond_with(errors(400, "HEALTH_CHECK_DOESNT_EXIST", "Health check not found"))
            .mount(&server)
            .await;

        let id = ResourceId::new("spotinst_health_check", "web");
        let state = provider(&server)
            .read(&id, Some("hc-gone"))
            .await
            .expect("read should succeed");

        assert!(!state.exists);
        assert!(state.identifier.is_none());
    }

    /// Server errors are reported, not mistaken for a missing object
    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/healthCheck/hc-1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let id = ResourceId::new("spotinst_health_check", "web");
        let err = provider(&server)
            .read(&id, Some("hc-1"))
            .await
            .expect_err("read should fail");

        assert!(err.to_string().contains("failed to read healthcheck"));
    }
}

/// Tests for the update and delete paths
mod update_delete_tests {
    use super::*;

    fn current(interval: i64) -> State {
        let resource = health_check(interval);
        State::existing(resource.id, resource.attributes).with_identifier("hc-1")
    }

    /// Unchanged attributes do not trigger a PUT
    #[tokio::test]
    async fn test_unchanged_resource_sends_no_update() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(items(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let desired = health_check(10);
        let state = provider(&server)
            .update(&desired.id, "hc-1", &current(10), &desired)
            .await
            .expect("update should succeed");

        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("hc-1"));
    }

    /// Changed attributes are sent without the id, then read back
    #[tokio::test]
    async fn test_changed_resource_is_updated() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/healthCheck/hc-1"))
            .and(body_partial_json(json!({
                "healthCheck": {"check": {"interval": 30, "port": 80}}
            })))
            .respond_with(items(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/healthCheck/hc-1"))
            .respond_with(items(json!([{
                "id": "hc-1",
                "resourceId": "sig-1",
                "proxyAddress": "http://proxy.example.com",
                "check": {"protocol": "http", "port": 80, "interval": 30, "timeout": 5}
            }])))
            .mount(&server)
            .await;

        let desired = health_check(30);
        let state = provider(&server)
            .update(&desired.id, "hc-1", &current(10), &desired)
            .await
            .expect("update should succeed");

        assert_eq!(state.attributes, desired.attributes);
    }

    /// Attributes removed from the configuration are cleared with an explicit
    /// null; server side values never declared are left out of the body
    #[tokio::test]
    async fn test_removed_attribute_is_sent_as_null() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/aws/ec2/group/sig-1"))
            .and(|request: &Request| {
                let body: serde_json::Value = match serde_json::from_slice(&request.body) {
                    Ok(body) => body,
                    Err(_) => return false,
                };
                let group = &body["group"];
                group["compute"]
                    .as_object()
                    .is_some_and(|compute| compute.get("elasticIps") == Some(&serde_json::Value::Null))
                    && group["compute"]["launchSpecification"]
                        .get("healthCheckType")
                        .is_none()
            })
            .respond_with(items(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-1"))
            .respond_with(items(json!([group_json("sig-1")])))
            .mount(&server)
            .await;

        let applied = group().with_attribute("elastic_ips", Value::from(vec!["eipalloc-1"]));
        let mut attributes = applied.attributes.clone();
        attributes.insert("health_check_type".to_string(), Value::from("EC2"));
        let current = State::existing(applied.id.clone(), attributes)
            .with_identifier("sig-1")
            .with_declared(applied.attributes.keys().cloned());

        let desired = group();
        let state = provider(&server)
            .update(&desired.id, "sig-1", &current, &desired)
            .await
            .expect("update should succeed");

        assert!(!state.attributes.contains_key("elastic_ips"));
    }

    /// Deleting an object that is already gone succeeds
    #[tokio::test]
    async fn test_delete_of_missing_object_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/healthCheck/hc-1"))
            .respond_with(errors(400, "HEALTH_CHECK_DOESNT_EXIST", "Health check not found"))
            .expect(1)
            .mount(&server)
            .await;

        let id = ResourceId::new("spotinst_health_check", "web");
        provider(&server)
            .delete(&id, "hc-1")
            .await
            .expect("delete should succeed");
    }
}

/// Tests for the Beanstalk elastigroup import and maintenance flow
mod beanstalk_tests {
    use super::*;

    fn beanstalk_group() -> Resource {
        Resource::new("spotinst_elastigroup_aws_beanstalk", "web")
            .with_attribute("name", "web-eg")
            .with_attribute("region", "us-west-2")
            .with_attribute("product", "Linux/UNIX")
            .with_attribute("min_size", 1i64)
            .with_attribute("max_size", 2i64)
            .with_attribute("desired_capacity", 1i64)
            .with_attribute("beanstalk_environment_id", "e-123")
            .with_attribute("instance_types_spot", Value::from(vec!["t3.medium"]))
    }

    fn beanstalk_json(maximum: i64) -> serde_json::Value {
        json!({
            "id": "sig-b1",
            "name": "web-eg",
            "region": "us-west-2",
            "capacity": {"minimum": 1, "maximum": maximum, "target": 1},
            "compute": {
                "product": "Linux/UNIX",
                "instanceTypes": {"ondemand": "t3.medium", "spot": ["t3.medium"]},
                "launchSpecification": {"imageId": "ami-1"}
            },
            "integration": {"elasticBeanstalk": {"environmentId": "e-123"}}
        })
    }

    fn status(value: &str) -> ResponseTemplate {
        items(json!([{"status": value}]))
    }

    /// Create imports the environment's group, keeps what the configuration
    /// does not override, and retries while the IAM profile propagates
    #[tokio::test]
    async fn test_group_is_imported_then_created() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/beanstalk/import"))
            .and(query_param("accountId", ACCOUNT))
            .and(query_param("environmentId", "e-123"))
            .and(query_param("region", "us-west-2"))
            .respond_with(items(json!([{
                "name": "awseb-e-123",
                "region": "us-west-2",
                "capacity": {"minimum": 1, "maximum": 1, "target": 1},
                "compute": {
                    "product": "Linux/UNIX",
                    "instanceTypes": {"ondemand": "t3.medium", "spot": ["t3.small"]},
                    "launchSpecification": {"imageId": "ami-1"}
                },
                "integration": {"elasticBeanstalk": {"environmentId": "e-123"}}
            }])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/aws/ec2/group"))
            .respond_with(errors(
                400,
                "InvalidParameterValue",
                "Invalid IAM Instance Profile name: aws-elasticbeanstalk-ec2-role",
            ))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/aws/ec2/group"))
            .and(body_partial_json(json!({
                "group": {
                    "name": "web-eg",
                    "capacity": {"maximum": 2},
                    "compute": {
                        "instanceTypes": {"ondemand": "t3.medium", "spot": ["t3.medium"]},
                        "launchSpecification": {"imageId": "ami-1"}
                    }
                }
            })))
            .respond_with(items(json!([{"id": "sig-b1"}])))
            .expect(1)
            .with_priority(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-b1"))
            .respond_with(items(json!([beanstalk_json(2)])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-b1/beanstalk/status"))
            .respond_with(status("ACTIVE"))
            .mount(&server)
            .await;

        let state = provider(&server)
            .create(&beanstalk_group())
            .await
            .expect("create should succeed");

        assert_eq!(state.identifier.as_deref(), Some("sig-b1"));
        assert_eq!(state.attributes["max_size"], Value::Int(2));
        assert_eq!(state.attributes["maintenance"], Value::from("END"));
        assert_eq!(state.attributes["beanstalk_environment_id"], Value::from("e-123"));
    }

    /// An environment the API does not know fails the create before any POST
    #[tokio::test]
    async fn test_missing_environment_fails_import() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/beanstalk/import"))
            .respond_with(errors(400, "GROUP_DOESNT_EXIST", "Environment not found"))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(items(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider(&server)
            .create(&beanstalk_group())
            .await
            .expect_err("import should fail");

        assert!(err.to_string().contains("does the Beanstalk environment exist"));
    }

    /// Maintenance starts once the group leaves its transitional state, then
    /// the changed capacity is sent
    #[tokio::test]
    async fn test_maintenance_starts_before_update() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-b1/beanstalk/status"))
            .respond_with(status("PENDING"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-b1/beanstalk/status"))
            .respond_with(status("ACTIVE"))
            .up_to_n_times(1)
            .with_priority(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-b1/beanstalk/status"))
            .respond_with(status("AWAIT_USER_UPDATE"))
            .with_priority(3)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/aws/ec2/group/sig-b1/beanstalk/maintenance/start"))
            .respond_with(items(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/aws/ec2/group/sig-b1"))
            .and(body_partial_json(json!({"group": {"capacity": {"maximum": 4}}})))
            .respond_with(items(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-b1"))
            .respond_with(items(json!([beanstalk_json(4)])))
            .mount(&server)
            .await;

        let applied = beanstalk_group().with_attribute("maintenance", "END");
        let current = State::existing(applied.id.clone(), applied.attributes.clone())
            .with_identifier("sig-b1")
            .with_declared(applied.attributes.keys().cloned());
        let desired = beanstalk_group()
            .with_attribute("max_size", 4i64)
            .with_attribute("maintenance", "START");

        let state = provider(&server)
            .update(&desired.id, "sig-b1", &current, &desired)
            .await
            .expect("update should succeed");

        assert_eq!(state.attributes["max_size"], Value::Int(4));
        assert_eq!(state.attributes["maintenance"], Value::from("START"));
    }

    /// Asking to end maintenance on an active group fails without retrying
    #[tokio::test]
    async fn test_ending_maintenance_on_active_group_fails() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/aws/ec2/group/sig-b1/beanstalk/status"))
            .respond_with(status("ACTIVE"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .respond_with(items(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let applied = beanstalk_group().with_attribute("maintenance", "START");
        let current = State::existing(applied.id.clone(), applied.attributes.clone())
            .with_identifier("sig-b1");
        let desired = beanstalk_group().with_attribute("maintenance", "END");

        let err = provider(&server)
            .update(&desired.id, "sig-b1", &current, &desired)
            .await
            .expect_err("update should fail");

        assert!(err.to_string().contains("maintenance"));
    }
}
