use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(DocumentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    NotStarted,
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    /// Calendar date as `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub nationality: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressInfo {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    /// ISO 3166 alpha-2 country code.
    pub country: String,
}

impl Default for AddressInfo {
    fn default() -> Self {
        Self {
            street: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            country: "US".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorType {
    Income,
    NetWorth,
    Professional,
    Entity,
}

impl InvestorType {
    pub const ALL: [InvestorType; 4] = [
        InvestorType::Income,
        InvestorType::NetWorth,
        InvestorType::Professional,
        InvestorType::Entity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::NetWorth => "net_worth",
            Self::Professional => "professional",
            Self::Entity => "entity",
        }
    }

    /// Document slot that substantiates a claim of this type.
    pub fn document_kind(self) -> DocumentKind {
        match self {
            Self::Income => DocumentKind::AccreditedIncome,
            Self::NetWorth => DocumentKind::AccreditedNetWorth,
            Self::Professional => DocumentKind::AccreditedProfessional,
            Self::Entity => DocumentKind::AccreditedEntity,
        }
    }
}

impl fmt::Display for InvestorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestorType {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvestorType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Type-specific accreditation data. Only the variant of the selected type
/// exists, so fields of other types can never be validated or submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccreditationClaim {
    Income {
        #[serde(default)]
        annual_income: Option<f64>,
    },
    NetWorth {
        #[serde(default)]
        net_worth: Option<f64>,
    },
    Professional {
        #[serde(default)]
        certification: Option<String>,
    },
    Entity {
        #[serde(default)]
        entity_type: Option<String>,
    },
}

impl AccreditationClaim {
    pub fn empty(investor_type: InvestorType) -> Self {
        match investor_type {
            InvestorType::Income => Self::Income {
                annual_income: None,
            },
            InvestorType::NetWorth => Self::NetWorth { net_worth: None },
            InvestorType::Professional => Self::Professional {
                certification: None,
            },
            InvestorType::Entity => Self::Entity { entity_type: None },
        }
    }

    pub fn investor_type(&self) -> InvestorType {
        match self {
            Self::Income { .. } => InvestorType::Income,
            Self::NetWorth { .. } => InvestorType::NetWorth,
            Self::Professional { .. } => InvestorType::Professional,
            Self::Entity { .. } => InvestorType::Entity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccreditedInvestor {
    pub claimed: bool,
    pub claim: Option<AccreditationClaim>,
}

impl AccreditedInvestor {
    pub fn selected_type(&self) -> Option<InvestorType> {
        self.claim.as_ref().map(AccreditationClaim::investor_type)
    }

    /// The claim that counts for validation and submission: `None` unless
    /// the user has actually claimed accredited status.
    pub fn active_claim(&self) -> Option<&AccreditationClaim> {
        if self.claimed {
            self.claim.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionDraft {
    pub personal: PersonalInfo,
    pub address: AddressInfo,
    pub accredited_investor: AccreditedInvestor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Passport,
    DriversLicense,
    NationalId,
    ProofOfAddress,
    BankStatement,
    AccreditedIncome,
    AccreditedNetWorth,
    AccreditedProfessional,
    AccreditedEntity,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 9] = [
        DocumentKind::Passport,
        DocumentKind::DriversLicense,
        DocumentKind::NationalId,
        DocumentKind::ProofOfAddress,
        DocumentKind::BankStatement,
        DocumentKind::AccreditedIncome,
        DocumentKind::AccreditedNetWorth,
        DocumentKind::AccreditedProfessional,
        DocumentKind::AccreditedEntity,
    ];

    /// Wire key (`documentTypeKey`) used for multipart file parts.
    pub fn key(self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::DriversLicense => "drivers_license",
            Self::NationalId => "national_id",
            Self::ProofOfAddress => "proof_of_address",
            Self::BankStatement => "bank_statement",
            Self::AccreditedIncome => "accredited_income",
            Self::AccreditedNetWorth => "accredited_net_worth",
            Self::AccreditedProfessional => "accredited_professional",
            Self::AccreditedEntity => "accredited_entity",
        }
    }

    pub fn is_identity(self) -> bool {
        matches!(
            self,
            Self::Passport | Self::DriversLicense | Self::NationalId
        )
    }

    pub fn is_accreditation(self) -> bool {
        self.key().starts_with("accredited_")
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DocumentKind {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key '{0}'")]
pub struct UnknownKey(pub String);
