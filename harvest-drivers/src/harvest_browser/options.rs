use serde_json::json;
use webdriver::capabilities::Capabilities;

/// Chrome command‑line arguments for a remote scraping session.
pub fn build_chrome_arguments(headless: bool) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    args
}

/// W3C capabilities requesting a Chrome session with [`build_chrome_arguments`].
pub fn chrome_capabilities(headless: bool) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": build_chrome_arguments(headless) }),
    );
    caps
}
