/// Row types read straight out of SQLite.
/// Distinct from adotely-types models to keep the DB layer independent.

pub struct DocumentRow {
    pub path: String,
    pub doc_id: String,
    pub fields: String,
}

pub struct NodeRow {
    pub path: String,
    pub value: String,
}

pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}
