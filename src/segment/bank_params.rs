//! Bank parameter data segments: HIBPA, HISHV, HIKPV, and the generic
//! business-transaction parameter carrier.

use crate::domain::BankParameterData;
use crate::element::groups::{
    parse_bank_identification, parse_supported_hbci_versions, parse_supported_languages,
};
use crate::element::types::{parse_yes_no, AlphaNumeric, Numeric};
use crate::error::{Error, Result};
use crate::extractor::extract_group_elements;
use crate::segment::{RawSegment, SegmentHeader};

/// HIBPA v2 — the common bank parameter snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonBankParameter {
    pub header: SegmentHeader,
    pub data: BankParameterData,
}

impl CommonBankParameter {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        if raw.elements.len() < 6 {
            return Err(Error::Segment {
                id: raw.header.id.clone(),
                reason: format!("expected at least 6 data elements, got {}", raw.elements.len()),
            });
        }
        let version = Numeric::unmarshal(raw.element(0)?)?.value() as u32;
        let bank_id = parse_bank_identification(raw.element(1)?)?;
        let bank_name = AlphaNumeric::unmarshal(raw.element(2)?)?.into_string();
        let max_transactions_per_message = Numeric::unmarshal(raw.element(3)?)?.value() as u32;
        let supported_languages = parse_supported_languages(raw.element(4)?)?;
        let supported_hbci_versions = parse_supported_hbci_versions(raw.element(5)?)?;
        let max_message_size = match raw.optional_element(6) {
            Some(bytes) => Some(Numeric::unmarshal(bytes)?.value() as u32),
            None => None,
        };
        Ok(CommonBankParameter {
            header: raw.header.clone(),
            data: BankParameterData {
                version,
                bank_id: Some(bank_id),
                bank_name,
                max_transactions_per_message,
                supported_languages,
                supported_hbci_versions,
                max_message_size,
            },
        })
    }
}

/// One security method the bank supports, e.g. `PIN` version 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityMethod {
    pub code: String,
    pub versions: Vec<u32>,
}

/// HISHV v2 — security methods the bank accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityMethods {
    pub header: SegmentHeader,
    /// Whether mixing security methods within one dialog is allowed.
    pub mix_allowed: bool,
    pub methods: Vec<SecurityMethod>,
}

impl SecurityMethods {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let mix_allowed = parse_yes_no(raw.element(0)?)?;
        let mut methods = Vec::new();
        for element in raw.elements.iter().skip(1).filter(|e| !e.is_empty()) {
            let parts = extract_group_elements(element)?;
            if parts.is_empty() {
                continue;
            }
            let code = AlphaNumeric::unmarshal(&parts[0])?.into_string();
            let versions = parts[1..]
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| Ok(Numeric::unmarshal(p)?.value() as u32))
                .collect::<Result<Vec<_>>>()?;
            methods.push(SecurityMethod { code, versions });
        }
        Ok(SecurityMethods {
            header: raw.header.clone(),
            mix_allowed,
            methods,
        })
    }
}

/// HIKPV v1 — compression methods the bank accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionMethods {
    pub header: SegmentHeader,
    pub methods: Vec<u32>,
}

impl CompressionMethods {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let mut methods = Vec::new();
        for element in raw.elements.iter().filter(|e| !e.is_empty()) {
            for part in extract_group_elements(element)? {
                if !part.is_empty() {
                    methods.push(Numeric::unmarshal(&part)?.value() as u32);
                }
            }
        }
        Ok(CompressionMethods {
            header: raw.header.clone(),
            methods,
        })
    }
}

/// A bank-defined business-transaction parameter segment (HIKAZS, HISALS,
/// ...). The layout beyond the leading limits is bank-defined; the
/// parameter cluster is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessTransactionParams {
    pub header: SegmentHeader,
    pub max_jobs_per_message: u32,
    pub min_signatures: u32,
    pub params: Vec<u8>,
}

impl BusinessTransactionParams {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let max_jobs_per_message = Numeric::unmarshal(raw.element(0)?)?.value() as u32;
        let min_signatures = Numeric::unmarshal(raw.element(1)?)?.value() as u32;
        let params = raw.optional_element(2).map(<[u8]>::to_vec).unwrap_or_default();
        Ok(BusinessTransactionParams {
            header: raw.header.clone(),
            max_jobs_per_message,
            min_signatures,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_bank_parameter_parses() {
        let raw = RawSegment::parse(
            b"HIBPA:4:2:3+12+280:10090000+Testbank+3+1+201:210:220+2048",
        )
        .unwrap();
        let parsed = CommonBankParameter::parse(&raw).unwrap();
        assert_eq!(parsed.data.version, 12);
        assert_eq!(parsed.data.bank_name, "Testbank");
        assert_eq!(parsed.data.max_transactions_per_message, 3);
        assert_eq!(parsed.data.supported_languages, vec![1]);
        assert_eq!(parsed.data.supported_hbci_versions, vec![201, 210, 220]);
        assert_eq!(parsed.data.max_message_size, Some(2048));
    }

    #[test]
    fn security_methods_parse() {
        let raw = RawSegment::parse(b"HISHV:5:2:3+N+RDH:1:2+PIN:1").unwrap();
        let parsed = SecurityMethods::parse(&raw).unwrap();
        assert!(!parsed.mix_allowed);
        assert_eq!(parsed.methods.len(), 2);
        assert_eq!(parsed.methods[0].code, "RDH");
        assert_eq!(parsed.methods[0].versions, vec![1, 2]);
        assert_eq!(parsed.methods[1].code, "PIN");
    }

    #[test]
    fn business_transaction_params_keep_cluster_verbatim() {
        let raw = RawSegment::parse(b"HIKAZS:6:5:3+1+1+90:N:N").unwrap();
        let parsed = BusinessTransactionParams::parse(&raw).unwrap();
        assert_eq!(parsed.max_jobs_per_message, 1);
        assert_eq!(parsed.min_signatures, 1);
        assert_eq!(parsed.params, b"90:N:N");
    }
}
