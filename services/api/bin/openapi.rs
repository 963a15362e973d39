use utoipa::OpenApi;
use vigil_api::router::ApiDoc;

/// Writes the control-plane OpenAPI specification to a file, or to stdout
/// when invoked with `-`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let spec_json = ApiDoc::openapi().to_pretty_json()?;

    if target == "-" {
        println!("{spec_json}");
    } else {
        std::fs::write(&target, spec_json)?;
    }
    Ok(())
}
