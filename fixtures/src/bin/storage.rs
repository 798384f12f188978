use clap::Parser;
use fitcheck::{state::decode_secret, storage::UploadSigner};
use fixtures::{run_server, storage_router, FixtureArgs, StorageState};

/// Object storage fixture server
#[derive(Parser, Debug)]
#[clap(name = "storage-fixture")]
struct Cli {
    #[clap(flatten)]
    common: FixtureArgs,

    /// Shared secret used to sign upload URLs; must match the app's STORAGE_SIGNING_KEY
    #[arg(long, env = "STORAGE_SIGNING_KEY")]
    signing_key: String,

    /// Base URL objects are served from
    #[arg(long, env = "STORAGE_PUBLIC_URL", default_value = "http://localhost:3001/objects")]
    public_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Only verification happens here, so the upload base is never used
    let signer = UploadSigner::new(&decode_secret(&args.signing_key), "", &args.public_url);
    let app = storage_router(StorageState::new(signer));

    run_server(args.common, app).await
}
