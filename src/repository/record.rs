use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::domain::record::{CollectionType, NormalizedRecord, Source};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::schema::propositions;
use crate::repository::{DieselRepository, RecordReader, RecordWriter, UpsertStats};

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = propositions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbRecord {
    title: String,
    description: Option<String>,
    content: Option<String>,
    link: Option<String>,
    date: Option<NaiveDate>,
    source: String,
    level: String,
    collection_type: String,
    relevance_score: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = propositions)]
struct NewDbRecord<'a> {
    identity_key: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    content: Option<&'a str>,
    link: Option<&'a str>,
    date: Option<NaiveDate>,
    source: &'static str,
    level: &'static str,
    collection_type: &'static str,
    relevance_score: Option<i32>,
}

impl<'a> From<&'a NormalizedRecord> for NewDbRecord<'a> {
    fn from(record: &'a NormalizedRecord) -> Self {
        Self {
            identity_key: record.identity_key(),
            title: record.title(),
            description: record.description(),
            content: record.content(),
            link: record.link(),
            date: record.date(),
            source: record.source().as_str(),
            level: record.level().as_str(),
            collection_type: record.collection_type().as_str(),
            relevance_score: record.relevance_score(),
        }
    }
}

impl TryFrom<DbRecord> for NormalizedRecord {
    type Error = RepositoryError;

    fn try_from(row: DbRecord) -> Result<Self, Self::Error> {
        let source: Source = row.source.parse().map_err(RepositoryError::Validation)?;
        let collection_type: CollectionType = row
            .collection_type
            .parse()
            .map_err(RepositoryError::Validation)?;
        if row.level != source.level().as_str() {
            return Err(RepositoryError::Validation(format!(
                "level {} does not match source {source}",
                row.level
            )));
        }

        let mut record = NormalizedRecord::new(row.title, source, collection_type)
            .ok_or_else(|| RepositoryError::Validation("empty title".into()))?
            .with_description(row.description)
            .with_content(row.content)
            .with_link(row.link)
            .with_date(row.date);
        if let Some(score) = row.relevance_score {
            record = record.with_relevance_score(score);
        }
        Ok(record)
    }
}

impl RecordReader for DieselRepository {
    fn list_records(&self) -> RepositoryResult<Vec<NormalizedRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<DbRecord> = propositions::table
            .order(propositions::id.asc())
            .select(DbRecord::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(NormalizedRecord::try_from).collect()
    }

    fn list_records_by_source(&self, source: Source) -> RepositoryResult<Vec<NormalizedRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<DbRecord> = propositions::table
            .filter(propositions::source.eq(source.as_str()))
            .order(propositions::id.asc())
            .select(DbRecord::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(NormalizedRecord::try_from).collect()
    }

    fn count_records(&self) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        Ok(propositions::table.count().get_result(&mut conn)?)
    }
}

/// Inserts `record` unless its identity key is taken. Returns the number of
/// created rows.
fn insert_new(conn: &mut SqliteConnection, record: &NormalizedRecord) -> QueryResult<usize> {
    diesel::insert_into(propositions::table)
        .values(NewDbRecord::from(record))
        .on_conflict(propositions::identity_key)
        .do_nothing()
        .execute(conn)
}

impl RecordWriter for DieselRepository {
    fn upsert(&self, record: &NormalizedRecord) -> RepositoryResult<bool> {
        let mut conn = self.conn()?;
        Ok(insert_new(&mut conn, record)? == 1)
    }

    /// Writes the batch in one transaction. A failing record does not roll
    /// back the others.
    fn upsert_batch(&self, records: &[&NormalizedRecord]) -> RepositoryResult<UpsertStats> {
        if records.is_empty() {
            return Ok(UpsertStats::default());
        }

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let mut stats = UpsertStats::default();
            for record in records {
                match insert_new(conn, record) {
                    Ok(1) => stats.created += 1,
                    Ok(_) => stats.skipped += 1,
                    Err(e) => {
                        log::error!("Failed to persist '{}': {e}", record.identity_key());
                        stats.failed += 1;
                    }
                }
            }
            Ok::<UpsertStats, RepositoryError>(stats)
        })
    }
}
