//! Database schema definition

pub const SCHEMA: &str = r#"
-- Documents table: one JSON body per (collection, id)
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL CHECK (json_valid(data)),
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);

-- Reference lookups issued on every page load
CREATE INDEX IF NOT EXISTS idx_documents_branch ON documents(collection, json_extract(data, '$.branch'));
CREATE INDEX IF NOT EXISTS idx_documents_subject ON documents(collection, json_extract(data, '$.subjectId'));
CREATE INDEX IF NOT EXISTS idx_documents_note ON documents(collection, json_extract(data, '$.noteId'));
"#;
