//! Real-crypto round trips: documents signed with the server key must
//! verify against the pinned server certificate and nothing else.

mod common;

use common::{
    CLIENT_CERT, SERVER_CERT, SERVER_KEY, ScriptedTransport, make_bag, make_bag_with_wrong_pin,
    response_envelope,
};
use transbank_webpay::credentials::Environment;
use transbank_webpay::error::Error;
use transbank_webpay::signature::{SignatureValidator, XmlSignatureSigner, XmlSignatureValidator};
use transbank_webpay::{RpcParam, SignedSoapClient};

fn signed_response(payload: &str) -> String {
    let signer = XmlSignatureSigner::new(SERVER_KEY, SERVER_CERT).expect("signer from fixtures");
    signer
        .sign_document(&response_envelope(payload))
        .expect("signing must succeed")
}

#[test]
fn signed_document_verifies_against_pinned_certificate() {
    let signed = signed_response("<ns2:statusResponse><return>AUTHORIZED</return></ns2:statusResponse>");
    let validator = XmlSignatureValidator::new();

    assert!(validator.validate(&signed, SERVER_CERT.as_bytes()).unwrap());
}

#[test]
fn signed_document_rejected_by_other_certificate() {
    let signed = signed_response("<resp>ok</resp>");
    let validator = XmlSignatureValidator::new();

    // Signed by the server key, pinned against the client certificate
    assert!(!validator.validate(&signed, CLIENT_CERT.as_bytes()).unwrap());
}

#[test]
fn tampered_body_rejected() {
    let signed = signed_response("<resp>AUTHORIZED</resp>");
    let tampered = signed.replace("AUTHORIZED", "REJECTED");
    let validator = XmlSignatureValidator::new();

    assert!(!validator.validate(&tampered, SERVER_CERT.as_bytes()).unwrap());
}

#[test]
fn tampered_signature_value_rejected() {
    let signed = signed_response("<resp>ok</resp>");

    // Corrupt the signature value while leaving the digest intact
    let start = signed.find("<SignatureValue>").unwrap() + "<SignatureValue>".len();
    let mut tampered = signed.clone();
    tampered.replace_range(start..start + 4, "AAAA");
    if tampered == signed {
        tampered.replace_range(start..start + 4, "BBBB");
    }

    let validator = XmlSignatureValidator::new();
    assert!(!validator.validate(&tampered, SERVER_CERT.as_bytes()).unwrap());
}

#[test]
fn prefixed_signature_verifies_against_pinned_certificate() {
    // JAX-WS gateways commonly emit the signature under the ds: prefix
    let signer = XmlSignatureSigner::new(SERVER_KEY, SERVER_CERT)
        .expect("signer from fixtures")
        .with_prefix("ds");
    let signed = signer
        .sign_document(&response_envelope("<resp>ok</resp>"))
        .expect("signing must succeed");
    let validator = XmlSignatureValidator::new();

    assert!(validator.validate(&signed, SERVER_CERT.as_bytes()).unwrap());

    let tampered = signed.replace("<resp>ok</resp>", "<resp>no</resp>");
    assert!(!validator.validate(&tampered, SERVER_CERT.as_bytes()).unwrap());
}

#[test]
fn unsigned_document_rejected() {
    let validator = XmlSignatureValidator::new();
    let unsigned = response_envelope("<resp>ok</resp>");
    assert!(!validator.validate(&unsigned, SERVER_CERT.as_bytes()).unwrap());
}

#[tokio::test]
async fn client_end_to_end_with_real_validator() {
    let signed =
        signed_response("<ns2:statusResponse><return>AUTHORIZED</return></ns2:statusResponse>");
    let transport = ScriptedTransport::replying(&signed);
    let requests = transport.requests.clone();

    let mut client = SignedSoapClient::with_parts(
        make_bag(Environment::Production),
        "https://test.example/ws",
        Box::new(transport),
        Box::new(XmlSignatureValidator::new()),
    )
    .unwrap();

    let response = client
        .invoke("getTransactionStatus", &[RpcParam::new("tokenInput", "token123")])
        .await
        .unwrap();

    assert_eq!(
        response.body(),
        "<ns2:statusResponse><return>AUTHORIZED</return></ns2:statusResponse>"
    );
    client.validate_last_response().unwrap();
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn client_rejects_response_signed_by_unexpected_certificate() {
    let signed = signed_response("<resp>looks fine</resp>");
    let transport = ScriptedTransport::replying(&signed);

    // Bag pins the client certificate, so the server-signed response is
    // untrusted even though the transport call succeeded.
    let mut client = SignedSoapClient::with_parts(
        make_bag_with_wrong_pin(Environment::Production),
        "https://test.example/ws",
        Box::new(transport),
        Box::new(XmlSignatureValidator::new()),
    )
    .unwrap();

    let err = client.invoke("getTransactionStatus", &[]).await.unwrap_err();
    assert!(matches!(err, Error::InvalidCertificate(_)));
    assert!(client.last_raw_response().is_some());
}
