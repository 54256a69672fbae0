//! SQLite snapshots of the base triples.
//!
//! A snapshot rewrites the `Statement` table with the current triples and
//! appends a row to the `Snapshot` ledger holding a blake3 digest over the
//! triples in statement order. Restoring recomputes the digest and refuses
//! data that does not match the latest ledger entry.

// used for persistence
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::construct::{Literal, Resource, Term, Triple, TripleStore};
use crate::datatype::Datatype;
use crate::error::{NetcladError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub snapshot: i64,
    pub taken_at: DateTime<Utc>,
    pub triples: usize,
    pub digest: String,
}

const NAMED: i64 = 0;
const BLANK: i64 = 1;
const LITERAL: i64 = 2;

pub struct Persistor {
    connection: Connection,
}

impl Persistor {
    pub fn open(path: &str) -> Result<Persistor> {
        let connection = Connection::open(path)?;
        connection.execute_batch(
            "
            create table if not exists DataType (
                DataType_Identity integer not null,
                DataType varchar(255) not null,
                constraint unique_and_referenceable_DataType_Identity primary key (
                    DataType_Identity
                )
            );
            create table if not exists Statement (
                Statement_Identity integer not null,
                Subject text not null,
                SubjectKind integer not null,
                Predicate text not null,
                Object text not null,
                ObjectKind integer not null,
                DataType_Identity integer null,
                constraint Statement_is_ordered_by_Statement_Identity primary key (
                    Statement_Identity
                ),
                constraint reference_to_DataType foreign key (
                    DataType_Identity
                ) references DataType(DataType_Identity)
            );
            create table if not exists Snapshot (
                Snapshot_Identity integer primary key autoincrement,
                TakenAt datetime not null,
                Triples integer not null,
                Digest char(64) not null
            );
            ",
        )?;
        for datatype in Datatype::ALL {
            connection.execute(
                "insert or ignore into DataType (DataType_Identity, DataType) values (?, ?)",
                params![datatype.uid() as i64, datatype.uri()],
            )?;
        }
        debug!(path, "snapshot store opened");
        Ok(Persistor { connection })
    }

    /// Replaces the stored triples with the content of the store and records
    /// the digest in the ledger.
    pub fn snapshot(&mut self, store: &TripleStore) -> Result<SnapshotInfo> {
        let taken_at = Utc::now();
        let mut hasher = blake3::Hasher::new();
        let mut triples = 0;
        let tx = self.connection.transaction()?;
        tx.execute("delete from Statement", [])?;
        {
            let mut insert = tx.prepare(
                "
                insert into Statement (
                    Statement_Identity,
                    Subject,
                    SubjectKind,
                    Predicate,
                    Object,
                    ObjectKind,
                    DataType_Identity
                ) values (?, ?, ?, ?, ?, ?, ?)
            ",
            )?;
            for triple in store.iter() {
                hasher.update(triple.to_string().as_bytes());
                hasher.update(b"\n");
                let (object, object_kind, datatype) = match &triple.object {
                    Term::Resource(r) => (r.as_str(), resource_kind(r), None),
                    Term::Literal(l) => (l.lexical(), LITERAL, Some(l.datatype().uid() as i64)),
                };
                triples += 1;
                insert.execute(params![
                    triples as i64,
                    triple.subject.as_str(),
                    resource_kind(&triple.subject),
                    triple.predicate.as_str(),
                    object,
                    object_kind,
                    datatype
                ])?;
            }
        }
        let digest = hasher.finalize().to_hex().to_string();
        tx.execute(
            "insert into Snapshot (TakenAt, Triples, Digest) values (?, ?, ?)",
            params![taken_at, triples as i64, digest],
        )?;
        let snapshot = tx.last_insert_rowid();
        tx.commit()?;
        info!(snapshot, triples, %digest, "snapshot taken");
        Ok(SnapshotInfo { snapshot, taken_at, triples, digest })
    }

    /// The latest ledger entry, if any snapshot was ever taken.
    pub fn latest(&self) -> Result<Option<SnapshotInfo>> {
        let latest = self
            .connection
            .query_row(
                "
                select Snapshot_Identity, TakenAt, Triples, Digest
                    from Snapshot
                    order by Snapshot_Identity desc
                    limit 1
            ",
                [],
                |r| {
                    Ok(SnapshotInfo {
                        snapshot: r.get(0)?,
                        taken_at: r.get(1)?,
                        triples: r.get::<_, i64>(2)? as usize,
                        digest: r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(latest)
    }

    /// Reads back the triples of the latest snapshot after verifying them
    /// against its digest.
    pub fn restore(&self) -> Result<Option<(SnapshotInfo, Vec<Triple>)>> {
        let Some(info) = self.latest()? else {
            return Ok(None);
        };
        let mut statement = self.connection.prepare(
            "
            select Subject, SubjectKind, Predicate, Object, ObjectKind, DataType_Identity
                from Statement
                order by Statement_Identity
        ",
        )?;
        let rows = statement.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, i64>(4)?,
                r.get::<_, Option<i64>>(5)?,
            ))
        })?;
        let mut hasher = blake3::Hasher::new();
        let mut triples = Vec::new();
        for row in rows {
            let (subject, subject_kind, predicate, object, object_kind, datatype) = row?;
            let object = match object_kind {
                LITERAL => {
                    let datatype = datatype
                        .and_then(|uid| u8::try_from(uid).ok())
                        .and_then(Datatype::from_uid)
                        .ok_or_else(|| corrupt(format!("unknown datatype for '{}'", object)))?;
                    Term::Literal(
                        Literal::new(object, datatype).map_err(|e| corrupt(e.to_string()))?,
                    )
                }
                kind => Term::Resource(resource(object, kind)?),
            };
            let triple = Triple::new(
                resource(subject, subject_kind)?,
                Resource::named(predicate),
                object,
            );
            hasher.update(triple.to_string().as_bytes());
            hasher.update(b"\n");
            triples.push(triple);
        }
        let digest = hasher.finalize().to_hex().to_string();
        if digest != info.digest || triples.len() != info.triples {
            return Err(corrupt(format!(
                "snapshot {} expected digest {} over {} triples, found {} over {}",
                info.snapshot,
                info.digest,
                info.triples,
                digest,
                triples.len()
            )));
        }
        Ok(Some((info, triples)))
    }
}

fn resource_kind(resource: &Resource) -> i64 {
    if resource.is_blank() { BLANK } else { NAMED }
}

fn resource(identifier: String, kind: i64) -> Result<Resource> {
    match kind {
        NAMED => Ok(Resource::Named(identifier)),
        BLANK => Ok(Resource::Blank(identifier)),
        other => Err(corrupt(format!("unknown resource kind {}", other))),
    }
}

fn corrupt(message: String) -> NetcladError {
    NetcladError::DataCorruption { message }
}
