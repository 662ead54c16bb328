//! Catalog statistics command.

use ma_furniture_server::db::ProductRepository;

/// Print catalog statistics as JSON.
///
/// # Errors
///
/// Returns an error if the database cannot be read.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let stats = ProductRepository::new(&pool).stats().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
