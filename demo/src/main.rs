use std::fs;
use std::path::Path;
use std::sync::Arc;

use dirs::config_dir;
use keeper_contracts_sdk::signers::KeystoreSigner;
use keeper_contracts_sdk::wrappers::{DidRegistration, DidRegistry, Dispenser, Token};
use keeper_contracts_sdk::{
    Account, ContractArtifact, KeeperContext, ResilientProvider, StaticArtifacts, B256, U256,
};
use log::info;

const CONTRACTS: [&str; 3] = [DidRegistry::CONTRACT_NAME, Token::CONTRACT_NAME, Dispenser::CONTRACT_NAME];

/// Reads `<Name>.<network>.json` artifact files from `dir`.
fn load_artifacts(dir: &Path, network: &str) -> Result<StaticArtifacts, Box<dyn std::error::Error>> {
    let mut artifacts = StaticArtifacts::new();
    for name in CONTRACTS {
        let path = dir.join(format!("{name}.{network}.json"));
        let artifact = ContractArtifact::from_json(&fs::read_to_string(&path)?)?;
        info!("{name} deployed at {}", artifact.address);
        artifacts.insert(network, name, artifact);
    }
    Ok(artifacts)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut keeper_dir = config_dir().ok_or("Failed to get config directory")?;
    keeper_dir.push("keeper");
    let key_file = keeper_dir.join("keyfile.json");
    let password = std::env::var("KEEPER_PASSWORD").unwrap_or_default();
    let signer = KeystoreSigner::load_keystore(&key_file, &password)?;
    let account = Account::new(
        signer.address(),
        Some(password),
        Some(key_file.display().to_string()),
    );
    info!("Using account {account}");

    let url = std::env::var("KEEPER_URL").unwrap_or_else(|_| "http://localhost:8545".to_string());
    let connection = ResilientProvider::connect(url.parse()?, Default::default());
    let network = keeper_contracts_sdk::context::network_name(
        keeper_contracts_sdk::ChainConnection::network_id(&connection).await?,
    );
    info!("Connected to {url}, network {network}");

    let ctx = KeeperContext::builder()
        .connection(Arc::new(connection))
        .artifacts(Arc::new(load_artifacts(&keeper_dir.join("artifacts"), &network)?))
        .network_name(network)
        .build()
        .await?;

    let token = Token::new(&ctx)?;
    info!(
        "Token balance before the request: {}",
        token.get_token_balance(account.address()).await?
    );
    let dispenser = Dispenser::new(&ctx)?;
    let granted = dispenser.request_tokens(U256::from(10), &account).await?;
    info!(
        "Dispenser granted the request: {granted}, balance is now {}",
        token.get_token_balance(account.address()).await?
    );

    let registry = DidRegistry::new(&ctx)?;
    let seed = keeper_contracts_sdk::keccak256(account.address().as_slice());
    let registered = registry
        .register(
            DidRegistration::builder()
                .did_seed(seed)
                .checksum(B256::repeat_byte(0x01))
                .url("https://metadata.example/api/v1/ddo")
                .build(),
            &account,
        )
        .await?;
    info!("DID registered: {registered}");

    let did = registry.hash_did(seed, account.address()).await?;
    let values = registry.get_did_register(did).await?;
    info!("DID {did} owned by {} points at {}", values.owner, values.url);
    info!("Assets of the account: {:?}", registry.get_owner_asset_ids(account.address()).await?);

    Ok(())
}
