//! Reads the AWS attributes out of a SAML assertion.
//!
//! The role listing page gives the role ARN; `AssumeRoleWithSAML` also needs
//! the SAML provider ARN, which only the assertion's `Role` attribute carries
//! (as `role_arn,provider_arn` pairs, in either order).

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::models::Arn;

const ROLE_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/Role";
const SESSION_DURATION_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/SessionDuration";

#[derive(Debug, thiserror::Error)]
pub enum AssertionError {
    #[error("assertion is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("assertion is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("assertion is not valid XML")]
    Xml(#[from] roxmltree::Error),
}

/// A role the assertion allows, with the SAML provider that vouches for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePair {
    pub role: Arn,
    pub principal: Arn,
}

/// Decoded SAML assertion.
#[derive(Debug, Clone)]
pub struct SamlAssertion {
    xml: String,
}

impl SamlAssertion {
    /// Decode the base64 form posted as `SAMLResponse`.
    pub fn decode(encoded: &str) -> Result<Self, AssertionError> {
        let compact: String = encoded.split_whitespace().collect();
        let bytes = STANDARD.decode(compact)?;
        let xml = String::from_utf8(bytes)?;
        // Parse once up front so later reads only fail on missing attributes.
        roxmltree::Document::parse(&xml)?;
        Ok(Self { xml })
    }

    /// Every parseable role/provider pair, in document order.
    pub fn role_pairs(&self) -> Vec<RolePair> {
        self.attribute_values(ROLE_ATTRIBUTE)
            .iter()
            .filter_map(|value| {
                let mut role = None;
                let mut principal = None;
                for part in value.split(',') {
                    match Arn::parse(part) {
                        Ok(arn) if arn.is_role() => role = Some(arn),
                        Ok(arn) if arn.is_saml_provider() => principal = Some(arn),
                        _ => {
                            tracing::debug!(value = %part, "Ignoring unexpected Role attribute part");
                        }
                    }
                }
                Some(RolePair {
                    role: role?,
                    principal: principal?,
                })
            })
            .collect()
    }

    /// SAML provider ARN paired with `role`.
    pub fn principal_for(&self, role: &Arn) -> Option<Arn> {
        self.role_pairs()
            .into_iter()
            .find(|pair| &pair.role == role)
            .map(|pair| pair.principal)
    }

    /// Maximum session length the identity provider grants, in seconds.
    pub fn session_duration(&self) -> Option<u32> {
        self.attribute_values(SESSION_DURATION_ATTRIBUTE)
            .first()
            .and_then(|v| v.trim().parse().ok())
    }

    fn attribute_values(&self, name: &str) -> Vec<String> {
        let Ok(doc) = roxmltree::Document::parse(&self.xml) else {
            return Vec::new();
        };
        doc.descendants()
            .filter(|n| n.has_tag_name("Attribute") && n.attribute("Name") == Some(name))
            .flat_map(|attr| attr.children().filter(|n| n.has_tag_name("AttributeValue")))
            .filter_map(|value| value.text())
            .map(|text| text.trim().to_string())
            .collect()
    }
}
