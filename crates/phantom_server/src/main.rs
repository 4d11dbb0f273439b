#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_phantom_server::init().await
}
