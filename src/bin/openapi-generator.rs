use multisport_score_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> serde_json::Result<()> {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json()?);
    Ok(())
}
