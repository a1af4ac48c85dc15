//! Cryptographic primitives and signature scripts.
//!
//! Wraps Ed25519 signing with strong types and defines the three redeem
//! script forms a program may carry:
//!
//! - standard: `[32] <public key> CHECKSIG`
//! - multisig: `<m> ([32] <public key>)*n <n> CHECKMULTISIG`
//! - cross-chain: `[32] <genesis block hash> CROSSCHAIN`
//!
//! A script's program hash is its address-kind prefix (picked by the
//! trailing opcode) followed by the first 20 bytes of its Blake3 digest.

use std::collections::HashSet;

use bytes::Bytes;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::transaction::Program;
use crate::types::{Hash256, ProgramHash, PREFIX_CROSS_CHAIN, PREFIX_MULTISIG, PREFIX_STANDARD};

pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CROSSCHAIN: u8 = 0xaf;

const PUBLIC_KEY_PUSH: u8 = 32;
const SIGNATURE_PUSH: u8 = 64;

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = Signature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &hex::encode(self.0)[..16])
    }
}

/// A keypair for signing transactions.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Program hash of this key's standard script.
    pub fn program_hash(&self) -> ProgramHash {
        hash_with_prefix(PREFIX_STANDARD, &standard_redeem_script(&self.public_key()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

fn hash_with_prefix(prefix: u8, code: &[u8]) -> ProgramHash {
    let digest = blake3::hash(code);
    let mut body = [0u8; 20];
    body.copy_from_slice(&digest.as_bytes()[..20]);
    ProgramHash::from_parts(prefix, &body)
}

/// Program hash of a redeem script.
pub fn to_program_hash(code: &[u8]) -> Result<ProgramHash, CoreError> {
    let Some(&last) = code.last() else {
        return Err(CoreError::InvalidProgramCode("empty code".into()));
    };
    let prefix = match last {
        OP_CHECKSIG => PREFIX_STANDARD,
        OP_CHECKMULTISIG => PREFIX_MULTISIG,
        OP_CROSSCHAIN => PREFIX_CROSS_CHAIN,
        other => {
            return Err(CoreError::InvalidProgramCode(format!(
                "unknown trailing opcode {other:#04x}"
            )))
        }
    };
    Ok(hash_with_prefix(prefix, code))
}

pub fn standard_redeem_script(public_key: &Ed25519PublicKey) -> Vec<u8> {
    let mut code = Vec::with_capacity(34);
    code.push(PUBLIC_KEY_PUSH);
    code.extend_from_slice(&public_key.0);
    code.push(OP_CHECKSIG);
    code
}

/// `m`-of-`n` multisig redeem script.
pub fn multisig_redeem_script(
    m: u8,
    public_keys: &[Ed25519PublicKey],
) -> Result<Vec<u8>, CoreError> {
    let n = u8::try_from(public_keys.len())
        .map_err(|_| CoreError::InvalidProgramCode("too many public keys".into()))?;
    if m == 0 || m > n {
        return Err(CoreError::InvalidProgramCode(format!("invalid threshold {m} of {n}")));
    }
    let mut code = Vec::with_capacity(3 + public_keys.len() * 33);
    code.push(m);
    for pk in public_keys {
        code.push(PUBLIC_KEY_PUSH);
        code.extend_from_slice(&pk.0);
    }
    code.push(n);
    code.push(OP_CHECKMULTISIG);
    Ok(code)
}

/// Script locking value to the side chain identified by its genesis block.
pub fn cross_chain_script(genesis_hash: &Hash256) -> Vec<u8> {
    let mut code = Vec::with_capacity(34);
    code.push(32);
    code.extend_from_slice(&genesis_hash.0);
    code.push(OP_CROSSCHAIN);
    code
}

/// Program hash main-chain deposits to this side chain are paid to.
pub fn genesis_program_hash(genesis_hash: &Hash256) -> ProgramHash {
    hash_with_prefix(PREFIX_CROSS_CHAIN, &cross_chain_script(genesis_hash))
}

/// Sign `message` and wrap the signature in a standard program.
pub fn standard_program(keypair: &Keypair, message: &[u8]) -> Program {
    let signature = keypair.sign(message);
    let mut parameter = Vec::with_capacity(65);
    parameter.push(SIGNATURE_PUSH);
    parameter.extend_from_slice(&signature.0);
    Program {
        code: Bytes::from(standard_redeem_script(&keypair.public_key())),
        parameter: Bytes::from(parameter),
    }
}

/// Build a multisig program from the given signers.
pub fn multisig_program(
    m: u8,
    public_keys: &[Ed25519PublicKey],
    signers: &[&Keypair],
    message: &[u8],
) -> Result<Program, CoreError> {
    let code = multisig_redeem_script(m, public_keys)?;
    let mut parameter = Vec::with_capacity(signers.len() * 65);
    for signer in signers {
        parameter.push(SIGNATURE_PUSH);
        parameter.extend_from_slice(&signer.sign(message).0);
    }
    Ok(Program {
        code: Bytes::from(code),
        parameter: Bytes::from(parameter),
    })
}

fn parse_public_key(bytes: &[u8]) -> Result<Ed25519PublicKey, CoreError> {
    let arr: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidPublicKey)?;
    Ok(Ed25519PublicKey(arr))
}

/// Split a parameter into its signature pushes.
pub fn parse_signatures(parameter: &[u8]) -> Result<Vec<Ed25519Signature>, CoreError> {
    if parameter.is_empty() || parameter.len() % 65 != 0 {
        return Err(CoreError::InvalidSignature);
    }
    parameter
        .chunks(65)
        .map(|chunk| {
            if chunk[0] != SIGNATURE_PUSH {
                return Err(CoreError::InvalidSignature);
            }
            let arr: [u8; 64] = chunk[1..].try_into().map_err(|_| CoreError::InvalidSignature)?;
            Ok(Ed25519Signature(arr))
        })
        .collect()
}

/// Execute a program against the signed message.
pub fn verify_program(program: &Program, message: &[u8]) -> Result<(), CoreError> {
    let code = &program.code[..];
    match code.last() {
        Some(&OP_CHECKSIG) => {
            if code.len() != 34 || code[0] != PUBLIC_KEY_PUSH {
                return Err(CoreError::InvalidProgramCode("malformed standard script".into()));
            }
            let public_key = parse_public_key(&code[1..33])?;
            let signatures = parse_signatures(&program.parameter)?;
            if signatures.len() != 1 {
                return Err(CoreError::InvalidSignature);
            }
            public_key.verify(message, &signatures[0])
        }
        Some(&OP_CHECKMULTISIG) => verify_multisig(code, &program.parameter, message),
        _ => Err(CoreError::InvalidProgramCode(
            "program is not a signature script".into(),
        )),
    }
}

fn verify_multisig(code: &[u8], parameter: &[u8], message: &[u8]) -> Result<(), CoreError> {
    if code.len() < 3 {
        return Err(CoreError::InvalidProgramCode("malformed multisig script".into()));
    }
    let m = code[0] as usize;
    let n = code[code.len() - 2] as usize;
    let body = &code[1..code.len() - 2];
    if m == 0 || m > n || body.len() != n * 33 {
        return Err(CoreError::InvalidProgramCode("malformed multisig script".into()));
    }
    let public_keys = body
        .chunks(33)
        .map(|chunk| {
            if chunk[0] != PUBLIC_KEY_PUSH {
                return Err(CoreError::InvalidProgramCode("malformed multisig key".into()));
            }
            parse_public_key(&chunk[1..])
        })
        .collect::<Result<Vec<_>, _>>()?;

    let signatures = parse_signatures(parameter)?;
    let mut signed_by: HashSet<usize> = HashSet::new();
    for signature in &signatures {
        if let Some(index) = public_keys
            .iter()
            .enumerate()
            .find(|(i, pk)| !signed_by.contains(i) && pk.verify(message, signature).is_ok())
            .map(|(i, _)| i)
        {
            signed_by.insert(index);
        }
    }
    if signed_by.len() < m {
        return Err(CoreError::InvalidSignature);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_deterministic() {
        let kp1 = Keypair::from_seed(&[0x42; 32]);
        let kp2 = Keypair::from_seed(&[0x42; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.program_hash(), kp2.program_hash());
    }

    #[test]
    fn test_program_hash_prefix_follows_opcode() {
        let kp = Keypair::from_seed(&[1; 32]);
        let standard = to_program_hash(&standard_redeem_script(&kp.public_key())).unwrap();
        assert_eq!(standard.prefix(), PREFIX_STANDARD);
        assert_eq!(standard, kp.program_hash());

        let multi = to_program_hash(&multisig_redeem_script(1, &[kp.public_key()]).unwrap()).unwrap();
        assert_eq!(multi.prefix(), PREFIX_MULTISIG);

        let genesis = genesis_program_hash(&Hash256::from_bytes([5; 32]));
        assert_eq!(genesis.prefix(), PREFIX_CROSS_CHAIN);
    }

    #[test]
    fn test_program_hash_rejects_unknown_code() {
        assert!(to_program_hash(&[]).is_err());
        assert!(to_program_hash(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn test_standard_program_verifies() {
        let kp = Keypair::from_seed(&[2; 32]);
        let program = standard_program(&kp, b"message");
        assert!(verify_program(&program, b"message").is_ok());
        assert!(matches!(
            verify_program(&program, b"other"),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_multisig_threshold() {
        let a = Keypair::from_seed(&[3; 32]);
        let b = Keypair::from_seed(&[4; 32]);
        let c = Keypair::from_seed(&[5; 32]);
        let keys = [a.public_key(), b.public_key(), c.public_key()];

        let enough = multisig_program(2, &keys, &[&a, &c], b"msg").unwrap();
        assert!(verify_program(&enough, b"msg").is_ok());

        let short = multisig_program(2, &keys, &[&b], b"msg").unwrap();
        assert!(verify_program(&short, b"msg").is_err());

        // The same signer twice counts once.
        let repeated = multisig_program(2, &keys, &[&a, &a], b"msg").unwrap();
        assert!(verify_program(&repeated, b"msg").is_err());
    }

    #[test]
    fn test_invalid_threshold() {
        let kp = Keypair::from_seed(&[6; 32]);
        assert!(multisig_redeem_script(0, &[kp.public_key()]).is_err());
        assert!(multisig_redeem_script(2, &[kp.public_key()]).is_err());
    }

    #[test]
    fn test_parse_signatures_rejects_bad_push() {
        let mut param = vec![SIGNATURE_PUSH];
        param.extend_from_slice(&[0u8; 64]);
        assert_eq!(parse_signatures(&param).unwrap().len(), 1);
        param[0] = 63;
        assert!(parse_signatures(&param).is_err());
        assert!(parse_signatures(&[]).is_err());
    }
}
