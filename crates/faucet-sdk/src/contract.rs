use serde::{Deserialize, Serialize};

use crate::cashaddr::CashAddress;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::params::FaucetParams;
use crate::script::{hash256, p2sh_locking_script, push_data};

const ARTIFACT_SOURCE: &str = include_str!("../contract/faucet.json");

pub const CLAIM_FUNCTION: &str = "claim";
pub const OWNER_UNLOCK_FUNCTION: &str = "ownerUnlock";

/// Compiled contract artifact (cashc JSON layout, bytecode as hex).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub constructor_inputs: Vec<AbiInput>,
    pub abi: Vec<AbiFunction>,
    pub bytecode: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiFunction {
    pub name: String,
    pub inputs: Vec<AbiInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AbiInput {
    fn is_signature(&self) -> bool {
        self.kind == "sig" || self.kind == "datasig"
    }
}

impl Artifact {
    /// The faucet artifact embedded in this crate.
    pub fn embedded() -> Result<Self> {
        Self::from_json(ARTIFACT_SOURCE)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Artifact(format!("parse error: {e}")))
    }

    /// Selector of `name`. Single-function contracts take no selector.
    fn function(&self, name: &str) -> Result<(Option<usize>, &AbiFunction)> {
        let index = self
            .abi
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        let selector = (self.abi.len() > 1).then_some(index);
        Ok((selector, &self.abi[index]))
    }
}

/// An unlocking argument. Signatures stay symbolic until finalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionArg {
    Bytes(Vec<u8>),
    Signature,
}

/// A resolved contract function invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub name: String,
    pub selector: Option<usize>,
    /// Arguments in declaration order.
    pub args: Vec<FunctionArg>,
}

impl FunctionCall {
    pub fn needs_signature(&self) -> bool {
        self.args.iter().any(|a| matches!(a, FunctionArg::Signature))
    }
}

/// Contract address pair returned by [`compile_contract`](crate::compile_contract).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetAddresses {
    pub address: String,
    pub token_address: String,
}

/// A faucet contract instantiated with its constructor parameters.
#[derive(Debug, Clone)]
pub struct CompiledFaucet {
    artifact: Artifact,
    params: FaucetParams,
    redeem_script: Vec<u8>,
    script_hash: [u8; 32],
}

impl CompiledFaucet {
    pub fn new(params: FaucetParams) -> Result<Self> {
        Self::with_artifact(Artifact::embedded()?, params)
    }

    pub fn with_artifact(artifact: Artifact, params: FaucetParams) -> Result<Self> {
        params.validate()?;

        let args = params.constructor_args();
        if artifact.constructor_inputs.len() != args.len() {
            return Err(Error::Artifact(format!(
                "{} expects {} constructor arguments, got {}",
                artifact.contract_name,
                artifact.constructor_inputs.len(),
                args.len()
            )));
        }
        let bytecode = hex::decode(&artifact.bytecode)
            .map_err(|e| Error::Artifact(format!("bytecode is not hex: {e}")))?;

        // Constructor arguments are pushed last-first ahead of the bytecode.
        let mut redeem_script = Vec::with_capacity(bytecode.len() + 64);
        for arg in args.iter().rev() {
            push_data(&mut redeem_script, arg);
        }
        redeem_script.extend_from_slice(&bytecode);
        let script_hash = hash256(&redeem_script);

        log::debug!(
            "instantiated {} contract ({} byte redeem script)",
            artifact.contract_name,
            redeem_script.len()
        );

        Ok(Self {
            artifact,
            params,
            redeem_script,
            script_hash,
        })
    }

    pub fn params(&self) -> &FaucetParams {
        &self.params
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn redeem_script(&self) -> &[u8] {
        &self.redeem_script
    }

    pub fn script_hash(&self) -> [u8; 32] {
        self.script_hash
    }

    /// `OP_HASH256 <hash256(redeem)> OP_EQUAL`
    pub fn locking_script(&self) -> Vec<u8> {
        p2sh_locking_script(&self.script_hash)
    }

    pub fn address(&self, network: Network) -> CashAddress {
        CashAddress::p2sh32(network, self.script_hash)
    }

    pub fn token_address(&self, network: Network) -> CashAddress {
        self.address(network).to_token_aware()
    }

    pub fn addresses(&self, network: Network) -> FaucetAddresses {
        FaucetAddresses {
            address: self.address(network).encode(),
            token_address: self.token_address(network).encode(),
        }
    }

    pub fn selector(&self, function: &str) -> Result<Option<usize>> {
        Ok(self.artifact.function(function)?.0)
    }

    /// Resolve a call to `function`, checking arity and argument kinds against the ABI.
    pub fn call(&self, function: &str, args: Vec<FunctionArg>) -> Result<FunctionCall> {
        let (selector, abi) = self.artifact.function(function)?;
        if abi.inputs.len() != args.len() {
            return Err(Error::Artifact(format!(
                "{function} takes {} arguments, got {}",
                abi.inputs.len(),
                args.len()
            )));
        }
        for (input, arg) in abi.inputs.iter().zip(&args) {
            if input.is_signature() != matches!(arg, FunctionArg::Signature) {
                return Err(Error::Artifact(format!(
                    "argument `{}` of {function} has the wrong kind",
                    input.name
                )));
            }
        }
        Ok(FunctionCall {
            name: function.to_string(),
            selector,
            args,
        })
    }

    pub fn claim_call(&self, passcode: &str) -> Result<FunctionCall> {
        self.call(
            CLAIM_FUNCTION,
            vec![FunctionArg::Bytes(passcode.as_bytes().to_vec())],
        )
    }

    pub fn owner_unlock_call(&self, public_key: [u8; 33]) -> Result<FunctionCall> {
        self.call(
            OWNER_UNLOCK_FUNCTION,
            vec![FunctionArg::Signature, FunctionArg::Bytes(public_key.to_vec())],
        )
    }
}
