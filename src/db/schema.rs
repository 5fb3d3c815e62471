pub const SCHEMA: &str = r#"
-- articles table, one row per source URL
CREATE TABLE IF NOT EXISTS articles (
    url TEXT PRIMARY KEY,
    headline TEXT NOT NULL,
    source_country TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    sentiment_label TEXT CHECK (sentiment_label IN ('positive', 'negative', 'neutral')),
    sentiment_confidence REAL
);

-- timestamps are YYYYMMDDThhmmssZ, so TEXT order is time order
CREATE INDEX IF NOT EXISTS idx_articles_timestamp ON articles(timestamp DESC);
"#;
