use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    BillOfLading,
    VehicleRegistration,
    Invoice,
    CustomsDeclaration,
    InsuranceCertificate,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BillOfLading => "bill_of_lading",
            Self::VehicleRegistration => "vehicle_registration",
            Self::Invoice => "invoice",
            Self::CustomsDeclaration => "customs_declaration",
            Self::InsuranceCertificate => "insurance_certificate",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    /// Unrecognized type names map to [`DocumentType::Other`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "bill_of_lading" => Self::BillOfLading,
            "vehicle_registration" => Self::VehicleRegistration,
            "invoice" => Self::Invoice,
            "customs_declaration" => Self::CustomsDeclaration,
            "insurance_certificate" => Self::InsuranceCertificate,
            _ => Self::Other,
        })
    }
}

impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Raw document text submitted for field extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub text: String,
    #[serde(default)]
    pub document_type: DocumentType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub success: bool,
    pub document_type: DocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{DocumentRequest, DocumentType};

    #[test]
    fn document_type_defaults_to_bill_of_lading() {
        let request: DocumentRequest =
            serde_json::from_value(serde_json::json!({ "text": "Shipper: ACME" })).expect("request");
        assert_eq!(request.document_type, DocumentType::BillOfLading);
    }

    #[test]
    fn unknown_document_type_maps_to_other() {
        let parsed: DocumentType =
            serde_json::from_value(serde_json::json!("Packing_List")).expect("type");
        assert_eq!(parsed, DocumentType::Other);
        assert_eq!(
            "Vehicle_Registration".parse::<DocumentType>(),
            Ok(DocumentType::VehicleRegistration)
        );
    }
}
