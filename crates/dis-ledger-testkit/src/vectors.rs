//! Golden test vectors for deterministic verification.
//!
//! Every implementation that reads or writes DIS receipts must agree on
//! these hashes and signatures byte for byte. Ed25519 signing is
//! deterministic, so the signature is fixed by the seed and hash.

use dis_ledger_core::{hash_value, Keypair, Receipt, ReceiptBuilder, ReceiptId};

/// A golden receipt vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    pub actor: &'static str,
    pub action: &'static str,
    pub created_at: &'static str,
    pub frozen_core_hash: &'static str,
    pub console_id: &'static str,
    pub issuer_seat: &'static str,
    /// Expected pipe-joined payload.
    pub expected_payload: &'static str,
    /// Expected hex SHA-256 of the payload.
    pub expected_hash: &'static str,
    /// Expected base64 public key for the seed.
    pub expected_public_key: &'static str,
    /// Expected base64 signature over the hash.
    pub expected_signature: &'static str,
}

/// Get all golden receipt vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "freeze by domain.terra",
            seed: [0x42; 32],
            actor: "domain.terra",
            action: "freeze.v1",
            created_at: "2025-01-01T00:00:00.000000000Z",
            frozen_core_hash: "DIS-CORE v1.0",
            console_id: "ac-7f3e",
            issuer_seat: "uid-terracouncil-001",
            expected_payload: "domain.terra|freeze.v1|2025-01-01T00:00:00.000000000Z|DIS-CORE v1.0|ac-7f3e|uid-terracouncil-001",
            expected_hash: "08efb07566f5f96ac017ca19131f37575e7b6a48502742e7c9992bdf07d1c012",
            expected_public_key: "IVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=",
            expected_signature: "BOEs2TI2U11wl/9EXR/PcBNghD9xoF6+Sm0VjMwW1o8TfAQdzlg6DVd6L/MZZblbaRyqviayKqWbt9aokPo5Ag==",
        },
        GoldenVector {
            name: "verify report by domain.aqua",
            seed: [0x07; 32],
            actor: "domain.aqua",
            action: "domain.verify.v1",
            created_at: "2025-06-30T12:34:56.789000000Z",
            frozen_core_hash: "DIS-CORE v1.0",
            console_id: "ac-aqua",
            issuer_seat: "uid-aqua-001",
            expected_payload: "domain.aqua|domain.verify.v1|2025-06-30T12:34:56.789000000Z|DIS-CORE v1.0|ac-aqua|uid-aqua-001",
            expected_hash: "e14327d7cd5af76e85c4866df1b216f1463d0119a509ed85b5998da8b0c24c23",
            expected_public_key: "6kpsY+KcUgq+9VB7Ey7F+ZVHdq6+vnuSQh7qaRRG0iw=",
            expected_signature: "rmhLsglnY5zM0Rrgx3m8Tyo0YCx4XNhoChSauLnkmxSCJR8ize9Q9rTEv2A/Hiq2XFyIzm6jWPq4N4DP3Un1CQ==",
        },
        GoldenVector {
            name: "empty context fields",
            seed: [0x00; 32],
            actor: "domain.terra",
            action: "console.approve.v1",
            created_at: "2024-12-31T23:59:59.999999999Z",
            frozen_core_hash: "",
            console_id: "",
            issuer_seat: "",
            expected_payload: "domain.terra|console.approve.v1|2024-12-31T23:59:59.999999999Z|||",
            expected_hash: "6b7b9033cf1f8552cc09884f041e0585105ac378fcc2c7a7d281c0d552b6754d",
            expected_public_key: "O2onvM62pC1io6jQKm8Nc2UyFXcd4kOmOsBIoYtZ2ik=",
            expected_signature: "ydPcXxZOI9qhFsj3/e3qA0+j50uhBraSYFt9M79Ni8cDOW4BWRfnuE9h/egoIadgHz00Aj6Aw6Z0FuPVBGjNAA==",
        },
    ]
}

/// Canonical JSON vector: (input with unsorted keys, canonical text, hash).
pub const CANONICAL_JSON_VECTOR: (&str, &str, &str) = (
    r#"{"b":{"y":1.5,"x":"é"},"a":[true,null]}"#,
    r#"{"a":[true,null],"b":{"x":"é","y":1.5}}"#,
    "6fb395298b9d8d7b40c897feba83317fc5da03c36e3b75eb195f69ac23fd1578",
);

/// `freeze_fingerprint(["bb", "aa"])`: sha256 of "aabb".
pub const FREEZE_FINGERPRINT_VECTOR: &str =
    "486b34250bd4400c0aa90516fce9a9c0633a922eb40d0828cf299bc4e825acf4";

/// Build and sign the receipt described by a vector.
pub fn receipt_from_vector(vector: &GoldenVector) -> Receipt {
    ReceiptBuilder::new(vector.actor, vector.action)
        .id(ReceiptId::new(format!("r-{}", &vector.expected_hash[..32])))
        .created_at(vector.created_at)
        .frozen_core_hash(vector.frozen_core_hash)
        .console(vector.console_id)
        .seat(vector.issuer_seat)
        .sign(&Keypair::from_seed(&vector.seed))
}

/// Check every vector. Returns one line per mismatch.
pub fn verify_all_vectors() -> Vec<String> {
    let mut failures = Vec::new();
    for v in all_vectors() {
        let receipt = receipt_from_vector(&v);
        if receipt.payload() != v.expected_payload {
            failures.push(format!("{}: payload {}", v.name, receipt.payload()));
        }
        if receipt.hash != v.expected_hash {
            failures.push(format!("{}: hash {}", v.name, receipt.hash));
        }
        if receipt.embedded_key() != Some(v.expected_public_key) {
            failures.push(format!("{}: public key {:?}", v.name, receipt.embedded_key()));
        }
        if receipt.signature != v.expected_signature {
            failures.push(format!("{}: signature {}", v.name, receipt.signature));
        }
    }

    let (input, _, expected) = CANONICAL_JSON_VECTOR;
    match serde_json::from_str::<serde_json::Value>(input).map(|v| hash_value(&v)) {
        Ok(Ok(hash)) if hash == expected => {}
        other => failures.push(format!("canonical json: {other:?}")),
    }

    failures
}
