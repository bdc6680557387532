use std::time::Duration;

use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use der::{DateTime, Encode};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{DistinguishedName, ExtensionParam, Validity};
use crate::error::{CertMintError, Result};
use crate::key::PublicKey;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The validity window of the certificate.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate, in order.
pub struct TbsCertificate<'a> {
    pub serial_number: u64,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: &'a DistinguishedName,
    pub validity: &'a Validity,
    pub subject: &'a DistinguishedName,
    pub subject_public_key: &'a PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate<'_> {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        let serial_number = SerialNumber::new(&self.serial_number.to_be_bytes())?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.as_x509_name()?,
            validity,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_tbs_certificate_inner()?.to_der()?)
    }
}

/// RFC 5280 §4.1.2.5: UTCTime through 2049, GeneralizedTime from 2050 on.
fn to_x509_time(time: OffsetDateTime) -> Result<x509_cert::time::Time> {
    let seconds = u64::try_from(time.unix_timestamp()).map_err(|_| {
        CertMintError::InvalidValidityWindow(format!(
            "{time} cannot be encoded: certificate times before 1970-01-01T00:00:00Z \
             are not supported by the DER time encoder"
        ))
    })?;
    let date_time = DateTime::from_unix_duration(Duration::from_secs(seconds))
        .map_err(|e| CertMintError::InvalidValidityWindow(format!("{time}: {e}")))?;

    if date_time.year() < 2050 {
        Ok(x509_cert::time::Time::UtcTime(UtcTime::from_date_time(
            date_time,
        )?))
    } else {
        Ok(x509_cert::time::Time::GeneralTime(
            GeneralizedTime::from_date_time(date_time),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPair;

    #[test]
    fn times_switch_encoding_in_2050() {
        let before = OffsetDateTime::from_unix_timestamp(2_524_607_999).unwrap(); // 2049-12-31T23:59:59Z
        let after = OffsetDateTime::from_unix_timestamp(2_524_608_000).unwrap(); // 2050-01-01T00:00:00Z
        assert!(matches!(
            to_x509_time(before).unwrap(),
            x509_cert::time::Time::UtcTime(_)
        ));
        assert!(matches!(
            to_x509_time(after).unwrap(),
            x509_cert::time::Time::GeneralTime(_)
        ));
    }

    #[test]
    fn pre_epoch_dates_are_rejected() {
        let time = OffsetDateTime::from_unix_timestamp(-1).unwrap();
        match to_x509_time(time) {
            Err(CertMintError::InvalidValidityWindow(message)) => {
                assert!(message.contains("before 1970-01-01"), "{message}");
                assert!(message.contains("not supported"), "{message}");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn serial_zero_is_encoded() {
        let name = DistinguishedName::new().with("CN", "zero").unwrap();
        let validity =
            Validity::from_rfc3339("2020-01-01T00:00:00Z", "2030-01-01T00:00:00Z").unwrap();
        let key = KeyPair::generate_ed25519().public_key();
        let tbs = TbsCertificate {
            serial_number: 0,
            signature_algorithm: SignatureAlgorithm::Ed25519,
            issuer: &name,
            validity: &validity,
            subject: &name,
            subject_public_key: &key,
            extensions: vec![],
        };
        let inner = tbs.to_tbs_certificate_inner().unwrap();
        assert_eq!(inner.serial_number.as_bytes(), &[0]);
        assert!(inner.extensions.is_none());
    }
}
