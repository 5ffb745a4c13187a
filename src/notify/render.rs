// src/notify/render.rs
use super::TokenAlert;
use crate::enrich::format_score;

pub fn subject(alert: &TokenAlert) -> String {
    format!(
        "New potentially interesting token: {} ({})",
        alert.item.name(),
        alert.item.symbol()
    )
}

pub fn body(alert: &TokenAlert) -> String {
    let it = &alert.item;
    format!(
        "A new token was detected with a GT Score above {threshold}%.\n\
         \n\
         Token information:\n\
         - Name: {name}\n\
         - Symbol: {symbol}\n\
         - ID: {id}\n\
         - Address: {address}\n\
         - GT Score: {score}\n\
         - Description: {description}\n\
         - Website: {website}\n\
         - Twitter: @{twitter}\n\
         \n\
         AI analysis:\n\
         {analysis}\n\
         \n\
         ---\n\
         This email was generated automatically by token-watch.\n",
        threshold = alert.threshold,
        name = it.name(),
        symbol = it.symbol(),
        id = it.id(),
        address = it.address(),
        score = format_score(it),
        description = it.description(),
        website = it.website(),
        twitter = it.twitter(),
        analysis = alert.analysis,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Item;

    fn alert() -> TokenAlert {
        let item = Item::new("solana_Abc", "solana", Some(91.5))
            .with_attr("name", "Abc Token")
            .with_attr("symbol", "ABC")
            .with_attr("websites", serde_json::json!(["https://abc.io"]));
        TokenAlert {
            item,
            analysis: "Strong community.".into(),
            threshold: 60.0,
        }
    }

    #[test]
    fn subject_names_token() {
        assert_eq!(
            subject(&alert()),
            "New potentially interesting token: Abc Token (ABC)"
        );
    }

    #[test]
    fn body_lists_fields_and_analysis() {
        let b = body(&alert());
        assert!(b.contains("above 60%"));
        assert!(b.contains("- ID: solana_Abc"));
        assert!(b.contains("- GT Score: 91.5"));
        assert!(b.contains("- Website: https://abc.io"));
        assert!(b.contains("- Twitter: @N/A"));
        assert!(b.contains("Strong community."));
    }
}
