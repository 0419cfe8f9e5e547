mod application;

mod presentation {
    pub mod cli;
}

use parcel_relay::Result;

#[tokio::main]
async fn main() -> Result<()> {
    application::run().await
}
