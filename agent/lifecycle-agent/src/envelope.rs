/*!

The `envelope` module models the request document that CloudFormation delivers to a custom
resource and the response document the handler must send back. Field spellings follow the
custom-resource protocol, which is why these types carry serde renames rather than the
camelCase used elsewhere in this workspace.

!*/

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The lifecycle action being requested.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// A custom-resource request document.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,

    /// The pre-signed URL that the response document must be `PUT` to.
    #[serde(rename = "ResponseURL")]
    pub response_url: String,

    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,

    #[serde(default)]
    pub resource_type: Option<String>,

    /// The physical id returned by the create that an update or delete refers to. Absent on
    /// create.
    #[serde(default)]
    pub physical_resource_id: Option<String>,

    /// The untyped property bag. Providers parse this into their `Properties` type.
    #[serde(default)]
    pub resource_properties: serde_json::Value,

    /// On update, the property bag from before the update.
    #[serde(default)]
    pub old_resource_properties: Option<serde_json::Value>,
}

/// Whether the handler succeeded or failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// The response document sent back to CloudFormation via the response URL.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,

    /// Required by the protocol when `status` is `FAILED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub physical_resource_id: String,

    // Correlation fields echoed from the event.
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,

    /// Name-value pairs the stack can read with `Fn::GetAtt`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_create_event() {
        let event: CustomResourceEvent = serde_json::from_value(json!({
            "RequestType": "Create",
            "ResponseURL": "https://cloudformation-custom-resource-response.example/signed",
            "StackId": "arn:aws:cloudformation:us-west-2:111122223333:stack/workshop/guid",
            "RequestId": "7f1b4a7e",
            "ResourceType": "Custom::Cloud9Environment",
            "LogicalResourceId": "WorkshopEnvironment",
            "ResourceProperties": {"name": "workshop"}
        }))
        .unwrap();
        assert_eq!(event.request_type, RequestType::Create);
        assert_eq!(event.logical_resource_id, "WorkshopEnvironment");
        assert!(event.physical_resource_id.is_none());
        assert_eq!(event.resource_properties["name"], "workshop");
    }

    #[test]
    fn parse_delete_event_carries_physical_id() {
        let event: CustomResourceEvent = serde_json::from_value(json!({
            "RequestType": "Delete",
            "ResponseURL": "https://cloudformation-custom-resource-response.example/signed",
            "StackId": "arn:aws:cloudformation:us-west-2:111122223333:stack/workshop/guid",
            "RequestId": "9c0d6b2f",
            "LogicalResourceId": "WorkshopEnvironment",
            "PhysicalResourceId": "env-0123456789abcdef0",
            "ResourceProperties": {"name": "workshop"}
        }))
        .unwrap();
        assert_eq!(event.request_type, RequestType::Delete);
        assert_eq!(
            event.physical_resource_id.as_deref(),
            Some("env-0123456789abcdef0")
        );
    }

    #[test]
    fn response_uses_protocol_spelling() {
        let response = CustomResourceResponse {
            status: ResponseStatus::Failed,
            reason: Some("Unable to create environment".to_string()),
            physical_resource_id: "env-0123456789abcdef0".to_string(),
            stack_id: "stack".to_string(),
            request_id: "request".to_string(),
            logical_resource_id: "logical".to_string(),
            data: BTreeMap::new(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["Status"], "FAILED");
        assert_eq!(value["Reason"], "Unable to create environment");
        assert_eq!(value["PhysicalResourceId"], "env-0123456789abcdef0");
        // An empty data bag is omitted entirely.
        assert!(value.get("Data").is_none());
    }
}
