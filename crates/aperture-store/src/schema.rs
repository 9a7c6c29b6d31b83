//! DDL for the gallery schema.
//!
//! Every statement is idempotent (`IF NOT EXISTS`), so an interrupted
//! bootstrap can be re-run safely: missing objects are created, existing
//! ones are left untouched. The column definitions are the compatibility
//! contract with existing data and must not drift.

/// Tables the bootstrapper expects to find in the `public` namespace.
pub const EXPECTED_TABLES: [&str; 3] = ["photos", "tags", "photo_tags"];

/// Which of the expected tables currently exist.
pub const TABLES_EXIST: &str = "\
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = 'public'
AND table_name = ANY($1)";

pub const CREATE_PHOTOS: &str = "\
CREATE TABLE IF NOT EXISTS photos (
    id TEXT PRIMARY KEY,
    title TEXT,
    caption TEXT,
    taken_at TIMESTAMP WITH TIME ZONE,
    width INTEGER,
    height INTEGER,
    aspect_ratio REAL,
    blur_data TEXT,
    make TEXT,
    model TEXT,
    focal_length TEXT,
    focal_length_in_35mm TEXT,
    f_number REAL,
    iso INTEGER,
    exposure_time TEXT,
    latitude REAL,
    longitude REAL,
    film_simulation TEXT,
    hidden BOOLEAN DEFAULT false,
    priority INTEGER DEFAULT 0,
    image_path TEXT NOT NULL,
    thumbnail_path TEXT,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
)";

pub const CREATE_TAGS: &str = "\
CREATE TABLE IF NOT EXISTS tags (
    id SERIAL PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
)";

pub const CREATE_PHOTO_TAGS: &str = "\
CREATE TABLE IF NOT EXISTS photo_tags (
    photo_id TEXT REFERENCES photos(id) ON DELETE CASCADE,
    tag_id INTEGER REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (photo_id, tag_id)
)";

/// Indexes backing the common filtered queries (capture time, camera
/// make, visibility).
pub const CREATE_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_photos_taken_at ON photos(taken_at)",
    "CREATE INDEX IF NOT EXISTS idx_photos_make ON photos(make)",
    "CREATE INDEX IF NOT EXISTS idx_photos_hidden ON photos(hidden)",
];

/// All creation statements in dependency order: tables first (photos and
/// tags before the join table that references them), then indexes.
pub fn create_statements() -> Vec<&'static str> {
    let mut statements = vec![CREATE_PHOTOS, CREATE_TAGS, CREATE_PHOTO_TAGS];
    statements.extend(CREATE_INDEXES);
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_are_ordered_tables_then_indexes() {
        let statements = create_statements();
        assert_eq!(statements.len(), 6);
        assert!(statements[0].contains("photos"));
        assert!(statements[1].contains("tags"));
        assert!(statements[2].contains("photo_tags"));
        for stmt in &statements[3..] {
            assert!(stmt.starts_with("CREATE INDEX IF NOT EXISTS"));
        }
    }

    #[test]
    fn every_statement_is_idempotent() {
        for stmt in create_statements() {
            assert!(stmt.contains("IF NOT EXISTS"), "not idempotent: {stmt}");
        }
    }

    #[test]
    fn join_table_cascades_both_ways() {
        assert!(CREATE_PHOTO_TAGS.contains("REFERENCES photos(id) ON DELETE CASCADE"));
        assert!(CREATE_PHOTO_TAGS.contains("REFERENCES tags(id) ON DELETE CASCADE"));
        assert!(CREATE_PHOTO_TAGS.contains("PRIMARY KEY (photo_id, tag_id)"));
    }

    #[test]
    fn tag_names_are_unique() {
        assert!(CREATE_TAGS.contains("name TEXT UNIQUE NOT NULL"));
    }

    #[test]
    fn expected_tables_match_ddl() {
        for table in EXPECTED_TABLES {
            assert!(
                create_statements()
                    .iter()
                    .any(|s| s.contains(&format!("CREATE TABLE IF NOT EXISTS {table}"))),
                "no CREATE TABLE for {table}"
            );
        }
    }

    #[test]
    fn index_columns_cover_filtered_queries() {
        assert!(CREATE_INDEXES[0].contains("photos(taken_at)"));
        assert!(CREATE_INDEXES[1].contains("photos(make)"));
        assert!(CREATE_INDEXES[2].contains("photos(hidden)"));
    }

    #[test]
    fn existence_check_targets_public_schema() {
        assert!(TABLES_EXIST.contains("information_schema.tables"));
        assert!(TABLES_EXIST.contains("table_schema = 'public'"));
    }
}
