use der::Encode;
use der::asn1::BitString;
use tracing::debug;
use x509_cert::certificate::CertificateInner;

use crate::cert::Certificate;
use crate::cert::extensions::{AuthorityKeyIdentifier, SubjectKeyIdentifier};
use crate::cert::params::{CertificationRequestInfo, DistinguishedName, ExtensionParam};
use crate::error::Result;
use crate::key::KeyPair;
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> &DistinguishedName;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// The request's extensions are followed by a Subject Key Identifier and
    /// an Authority Key Identifier. The signature algorithm follows from the
    /// signing key's type.
    fn issue(&self, cert_request: &CertificationRequestInfo) -> Result<Certificate> {
        let signing_key = self.signing_key();
        let signature_algo = signing_key.signature_algorithm();

        let mut extensions = cert_request.extensions.clone();
        extensions.push(ExtensionParam::from_extension(
            SubjectKeyIdentifier::for_key(&cert_request.subject_public_key)?,
            false,
        )?);
        extensions.push(ExtensionParam::from_extension(
            AuthorityKeyIdentifier::for_key(&signing_key.public_key())?,
            false,
        )?);

        let tbs_cert = TbsCertificate {
            serial_number: cert_request.serial,
            signature_algorithm: signature_algo,
            issuer: self.issuer_name(),
            validity: &cert_request.validity,
            subject: &cert_request.subject,
            subject_public_key: &cert_request.subject_public_key,
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = signing_key.sign_data(&tbs_cert_inner.to_der()?)?;

        debug!(
            serial = cert_request.serial,
            key_type = %signing_key.key_type(),
            extensions = tbs_cert.extensions.len(),
            "signed certificate"
        );

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algo.into(),
            signature: BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

/// The issuer named by a build request, signing with its resolved key.
pub struct RequestIssuer<'a> {
    pub name: &'a DistinguishedName,
    pub key: &'a KeyPair,
}

impl Issuer for RequestIssuer<'_> {
    fn issuer_name(&self) -> &DistinguishedName {
        self.name
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }
}
