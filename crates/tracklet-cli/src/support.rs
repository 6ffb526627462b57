use serde_json::Value;
use tracklet_api::IssueService;
use tracklet_store::JsonlProjectStore;

pub fn open_service(store: &str) -> IssueService<JsonlProjectStore> {
    IssueService::new(JsonlProjectStore::new(store))
}

pub fn parse_filters_or_exit(filters: &[String]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|raw| match raw.split_once('=') {
            Some((key, value)) if !key.is_empty() => (key.to_string(), value.to_string()),
            _ => {
                eprintln!("error: invalid --filter `{raw}`; expected field=value");
                std::process::exit(1);
            }
        })
        .collect()
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

pub fn open_label(open: bool) -> &'static str {
    if open { "open" } else { "closed" }
}
