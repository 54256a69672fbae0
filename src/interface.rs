//! The access façade: the only mutation surface of the knowledge base.
//!
//! The graph sits behind a reader-writer lock. A [`WriteTransaction`] holds
//! the write lock for its whole lifetime and journals every change it makes;
//! unless it is committed, the journal is undone when it ends, whether by
//! [`WriteTransaction::abort`], by a failed batch insert, or by simply going
//! out of scope. A [`ReadTransaction`] holds a read lock, so any number of
//! readers see the last committed state while no writer is active.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::construct::{Literal, Resource, Term, Triple};
use crate::datatype::Datatype;
use crate::engine::{Engine, ResultSet};
use crate::error::{NetcladError, Result};
use crate::finding::{Finding, ValidationReport};
use crate::graph::Graph;
use crate::persist::{PersistenceMode, Persistor, SnapshotInfo};
use crate::reasoner;
use crate::settings::Settings;
use crate::topology::{Analyzer, Report};
use crate::vocabulary::NetworkVocabulary;

// ------------- Records -------------
/// A triple as delivered by an external loader. Subjects starting with `_:`
/// are blank nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub subject: String,
    pub predicate: String,
    pub object: RecordObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordObject {
    Iri {
        value: String,
    },
    Blank {
        value: String,
    },
    Literal {
        value: String,
        /// Datatype URI, `xsd:string` when absent.
        #[serde(default)]
        datatype: Option<String>,
    },
}

impl TryFrom<Record> for Triple {
    type Error = NetcladError;
    fn try_from(record: Record) -> Result<Triple> {
        let subject = match record.subject.strip_prefix("_:") {
            Some(id) => Resource::blank(id),
            None => Resource::named(record.subject),
        };
        let object = match record.object {
            RecordObject::Iri { value } => Term::Resource(Resource::named(value)),
            RecordObject::Blank { value } => {
                let id = value.strip_prefix("_:").unwrap_or(&value).to_string();
                Term::Resource(Resource::blank(id))
            }
            RecordObject::Literal { value, datatype: None } => Term::Literal(Literal::string(value)),
            RecordObject::Literal { value, datatype: Some(uri) } => {
                let datatype = Datatype::from_uri(&uri).ok_or_else(|| {
                    NetcladError::InvalidTerm(format!("unsupported datatype <{}>", uri))
                })?;
                Term::Literal(Literal::new(value, datatype)?)
            }
        };
        let triple = Triple::new(subject, Resource::named(record.predicate), object);
        triple.validate()?;
        Ok(triple)
    }
}

// ------------- KnowledgeBase -------------
pub struct KnowledgeBase {
    graph: RwLock<Graph>,
    persistor: Mutex<Option<Persistor>>,
    vocabulary: NetworkVocabulary,
}

impl KnowledgeBase {
    pub fn new(mode: PersistenceMode) -> Result<Self> {
        Self::with_vocabulary(mode, NetworkVocabulary::default())
    }

    pub fn open(settings: &Settings) -> Result<Self> {
        Self::with_vocabulary(
            settings.persistence_mode(),
            NetworkVocabulary::new(&settings.ontology_namespace),
        )
    }

    /// In file mode the latest snapshot is restored before returning.
    pub fn with_vocabulary(mode: PersistenceMode, vocabulary: NetworkVocabulary) -> Result<Self> {
        let persistor = match &mode {
            PersistenceMode::InMemory => None,
            PersistenceMode::File(path) => Some(Persistor::open(path)?),
        };
        let kb = KnowledgeBase {
            graph: RwLock::new(Graph::new()),
            persistor: Mutex::new(persistor),
            vocabulary,
        };
        if let PersistenceMode::File(path) = &mode {
            let restored = kb.restore()?;
            info!(path, restored, "knowledge base opened");
        }
        Ok(kb)
    }

    pub fn vocabulary(&self) -> &NetworkVocabulary {
        &self.vocabulary
    }

    // A writer that panics has already been rolled back by its drop, so the
    // graph behind a poisoned lock is the last committed state.
    fn write_graph(&self) -> RwLockWriteGuard<'_, Graph> {
        self.graph.write().unwrap_or_else(|poisoned| {
            warn!("write transaction panicked, recovering the committed graph");
            self.graph.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }

    fn read_graph(&self) -> RwLockReadGuard<'_, Graph> {
        self.graph.read().unwrap_or_else(|poisoned| {
            warn!("write transaction panicked, recovering the committed graph");
            self.graph.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }

    /// Takes the write lock. Changes become permanent on commit only.
    pub fn begin_write(&self) -> Result<WriteTransaction<'_>> {
        let guard = self.write_graph();
        Ok(WriteTransaction {
            guard,
            journal: Vec::new(),
            state: State::Active,
            vocabulary: &self.vocabulary,
        })
    }

    pub fn begin_read(&self) -> Result<ReadTransaction<'_>> {
        let guard = self.read_graph();
        Ok(ReadTransaction { guard, vocabulary: &self.vocabulary })
    }

    pub fn execute(&self, query: &str) -> Result<ResultSet> {
        self.begin_read()?.execute(query)
    }

    pub fn validate(&self) -> Result<ValidationReport> {
        Ok(self.begin_read()?.validate())
    }

    pub fn analyze(&self, report: Report) -> Result<Vec<Finding>> {
        Ok(self.begin_read()?.analyze(report))
    }

    pub fn class_closure(&self, class: &Resource) -> Result<BTreeSet<Resource>> {
        Ok(self.begin_read()?.graph().schema().class_closure(class))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.begin_read()?.graph().len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Writes the committed triples to the snapshot store. `None` in memory mode.
    pub fn snapshot(&self) -> Result<Option<SnapshotInfo>> {
        let mut persistor = self.persistor.lock()?;
        let Some(persistor) = persistor.as_mut() else {
            return Ok(None);
        };
        let graph = self.read_graph();
        Ok(Some(persistor.snapshot(graph.base())?))
    }

    /// Replaces the graph with the latest verified snapshot and returns the
    /// number of triples restored. The graph is left untouched when there is
    /// nothing to restore or the snapshot fails verification.
    pub fn restore(&self) -> Result<usize> {
        let persistor = self.persistor.lock()?;
        let Some(persistor) = persistor.as_ref() else {
            return Ok(0);
        };
        let Some((info, triples)) = persistor.restore()? else {
            return Ok(0);
        };
        let mut graph = self.write_graph();
        graph.clear();
        for triple in triples {
            graph.insert(triple);
        }
        info!(snapshot = info.snapshot, triples = info.triples, "snapshot restored");
        Ok(graph.len())
    }
}

// ------------- Transactions -------------
#[derive(Debug)]
enum Change {
    Inserted(Triple),
    Removed(Triple),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active,
    Failed,
    Finished,
}

pub struct WriteTransaction<'kb> {
    guard: RwLockWriteGuard<'kb, Graph>,
    journal: Vec<Change>,
    state: State,
    vocabulary: &'kb NetworkVocabulary,
}

impl<'kb> WriteTransaction<'kb> {
    fn ensure_active(&self) -> Result<()> {
        match self.state {
            State::Active => Ok(()),
            State::Failed => Err(NetcladError::Transaction(
                "the transaction was rolled back after a failed insert".to_string(),
            )),
            State::Finished => Err(NetcladError::Transaction(
                "the transaction has already ended".to_string(),
            )),
        }
    }

    /// Undoes the journal, marks the transaction failed and reports why.
    fn fail(&mut self, reason: impl Display) -> NetcladError {
        let undone = self.rollback();
        self.state = State::Failed;
        warn!(undone, %reason, "write transaction rolled back");
        NetcladError::Transaction(reason.to_string())
    }

    fn rollback(&mut self) -> usize {
        let undone = self.journal.len();
        while let Some(change) = self.journal.pop() {
            match change {
                Change::Inserted(triple) => {
                    self.guard.remove(&triple);
                }
                Change::Removed(triple) => {
                    self.guard.insert(triple);
                }
            }
        }
        undone
    }

    pub fn insert(&mut self, triple: Triple) -> Result<bool> {
        self.ensure_active()?;
        if let Err(e) = triple.validate() {
            return Err(self.fail(e));
        }
        let changed = self.guard.insert(triple.clone());
        if changed {
            self.journal.push(Change::Inserted(triple));
        }
        Ok(changed)
    }

    /// Inserts a batch, returning how many triples were new.
    pub fn insert_all<I>(&mut self, triples: I) -> Result<usize>
    where
        I: IntoIterator<Item = Triple>,
    {
        self.try_insert_all(triples.into_iter().map(Ok::<Triple, NetcladError>))
    }

    /// Inserts a batch coming from a fallible source. The first error rolls
    /// back everything this transaction has done so far, and the transaction
    /// can no longer be committed.
    pub fn try_insert_all<I, E>(&mut self, triples: I) -> Result<usize>
    where
        I: IntoIterator<Item = std::result::Result<Triple, E>>,
        E: Display,
    {
        self.ensure_active()?;
        let mut inserted = 0;
        for (position, triple) in triples.into_iter().enumerate() {
            let triple = match triple {
                Ok(triple) => triple,
                Err(e) => return Err(self.fail(format!("item {}: {}", position, e))),
            };
            if let Err(e) = triple.validate() {
                return Err(self.fail(format!("item {}: {}", position, e)));
            }
            if self.guard.insert(triple.clone()) {
                self.journal.push(Change::Inserted(triple));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    pub fn insert_records<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Record>,
    {
        self.try_insert_all(records.into_iter().map(Triple::try_from))
    }

    pub fn remove(&mut self, triple: &Triple) -> Result<bool> {
        self.ensure_active()?;
        let changed = self.guard.remove(triple);
        if changed {
            self.journal.push(Change::Removed(triple.clone()));
        }
        Ok(changed)
    }

    /// The graph including this transaction's uncommitted changes.
    pub fn graph(&self) -> &Graph {
        &self.guard
    }

    pub fn execute(&self, query: &str) -> Result<ResultSet> {
        Engine::new(self.guard.view()).execute(query)
    }

    pub fn validate(&self) -> ValidationReport {
        reasoner::validate(&self.guard, self.vocabulary)
    }

    /// Keeps the changes and releases the write lock. Returns the number of
    /// changes made.
    pub fn commit(mut self) -> Result<usize> {
        self.ensure_active()?;
        self.state = State::Finished;
        let changes = self.journal.len();
        let inserted = self
            .journal
            .iter()
            .filter(|c| matches!(c, Change::Inserted(_)))
            .count();
        info!(changes, inserted, removed = changes - inserted, triples = self.guard.len(), "write transaction committed");
        self.journal.clear();
        Ok(changes)
    }

    /// Discards every change since `begin_write`.
    pub fn abort(mut self) -> usize {
        let undone = self.rollback();
        self.state = State::Finished;
        info!(undone, "write transaction aborted");
        undone
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if self.state == State::Active && !self.journal.is_empty() {
            let undone = self.rollback();
            warn!(undone, "write transaction dropped without commit, rolled back");
        }
    }
}

pub struct ReadTransaction<'kb> {
    guard: RwLockReadGuard<'kb, Graph>,
    vocabulary: &'kb NetworkVocabulary,
}

impl<'kb> ReadTransaction<'kb> {
    pub fn graph(&self) -> &Graph {
        &self.guard
    }

    pub fn execute(&self, query: &str) -> Result<ResultSet> {
        Engine::new(self.guard.view()).execute(query)
    }

    pub fn validate(&self) -> ValidationReport {
        reasoner::validate(&self.guard, self.vocabulary)
    }

    pub fn analyzer(&self) -> Analyzer<'_> {
        Analyzer::new(self.guard.view(), self.vocabulary)
    }

    pub fn analyze(&self, report: Report) -> Vec<Finding> {
        let findings = self.analyzer().report(report);
        info!(%report, findings = findings.len(), "topology analysis complete");
        findings
    }
}
