pub mod dto;
pub mod import;
mod store;

pub use dto::Candidacy;
pub use import::{EC_RESULTS_URL, import_ec_results, label_winners};

pub fn normalize_province(name: &str) -> Option<String> {
    let code = match name.trim().to_lowercase().as_str() {
        "ab" | "alberta" => "AB",
        "bc" | "b.c." | "british columbia" => "BC",
        "mb" | "manitoba" => "MB",
        "nb" | "new brunswick" => "NB",
        "nf" | "nl" | "newfoundland" | "newfoundland and labrador" => "NL",
        "nt" | "northwest territories" => "NT",
        "ns" | "nova scotia" => "NS",
        "nu" | "nunavut" => "NU",
        "on" | "ontario" => "ON",
        "pe" | "pei" | "p.e.i." | "prince edward island" => "PE",
        "pq" | "qc" | "quebec" | "québec" => "QC",
        "sk" | "saskatchewan" => "SK",
        "yk" | "yt" | "yukon" | "yukon territory" => "YT",
        _ => return None,
    };
    Some(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provinces_normalize() {
        assert_eq!(normalize_province("P.E.I.").as_deref(), Some("PE"));
        assert_eq!(normalize_province(" Yukon ").as_deref(), Some("YT"));
        assert_eq!(normalize_province("Yukon Territory").as_deref(), Some("YT"));
        assert_eq!(normalize_province("Atlantis"), None);
    }
}
