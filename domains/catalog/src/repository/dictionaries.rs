//! Dictionary repository
//!
//! One repository serves all seven dictionary kinds. Calls name the kind they
//! operate on; write payloads must be of that same kind.

use tokio::time::Instant;
use tracing::debug;
use volha_common::{within_deadline, DbScope, OpContext, RepositoryError, Result};

use crate::domain::entities::{
    Article, Brand, Category, Color, Country, Dictionary, DictionaryKind, Material, Slide,
};
use crate::repository::records::{
    delete_sql, insert_sql, scan_many, scan_one, select_all_sql, select_one_sql, update_sql,
    DictionaryRecord,
};

const OP_LIST: &str = "catalog.dictionary.list";
const OP_GET: &str = "catalog.dictionary.get";
const OP_CREATE: &str = "catalog.dictionary.create";
const OP_UPDATE: &str = "catalog.dictionary.update";
const OP_DELETE: &str = "catalog.dictionary.delete";

pub struct DictionaryRepository<'t> {
    scope: DbScope<'t>,
    deadline: Option<Instant>,
}

impl<'t> DictionaryRepository<'t> {
    pub fn new(scope: DbScope<'t>) -> Self {
        Self {
            scope,
            deadline: None,
        }
    }

    /// Give up reads with a timeout once `deadline` passes
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// List every entity of `kind`, ordered by id
    pub async fn list(&mut self, kind: DictionaryKind) -> Result<Vec<Dictionary>> {
        debug!(kind = %kind, "Listing dictionary entities");
        match kind {
            DictionaryKind::Brand => self.list_of::<Brand>().await,
            DictionaryKind::Category => self.list_of::<Category>().await,
            DictionaryKind::Country => self.list_of::<Country>().await,
            DictionaryKind::Material => self.list_of::<Material>().await,
            DictionaryKind::Color => self.list_of::<Color>().await,
            DictionaryKind::Slide => self.list_of::<Slide>().await,
            DictionaryKind::Article => self.list_of::<Article>().await,
        }
        .op(OP_LIST)
    }

    /// Find entity of `kind` by ID
    pub async fn get(&mut self, kind: DictionaryKind, id: &str) -> Result<Dictionary> {
        debug!(kind = %kind, id, "Fetching dictionary entity");
        match kind {
            DictionaryKind::Brand => self.get_of::<Brand>(id).await,
            DictionaryKind::Category => self.get_of::<Category>(id).await,
            DictionaryKind::Country => self.get_of::<Country>(id).await,
            DictionaryKind::Material => self.get_of::<Material>(id).await,
            DictionaryKind::Color => self.get_of::<Color>(id).await,
            DictionaryKind::Slide => self.get_of::<Slide>(id).await,
            DictionaryKind::Article => self.get_of::<Article>(id).await,
        }
        .op(OP_GET)
    }

    /// Insert a new entity
    pub async fn create(&mut self, kind: DictionaryKind, entity: &Dictionary) -> Result<()> {
        ensure_kind(kind, entity).op(OP_CREATE)?;
        debug!(kind = %kind, id = entity.id(), "Creating dictionary entity");
        match entity {
            Dictionary::Brand(e) => self.insert(e).await,
            Dictionary::Category(e) => self.insert(e).await,
            Dictionary::Country(e) => self.insert(e).await,
            Dictionary::Material(e) => self.insert(e).await,
            Dictionary::Color(e) => self.insert(e).await,
            Dictionary::Slide(e) => self.insert(e).await,
            Dictionary::Article(e) => self.insert(e).await,
        }
        .op(OP_CREATE)
    }

    /// Replace every column of an existing entity
    pub async fn update(&mut self, kind: DictionaryKind, entity: &Dictionary) -> Result<()> {
        ensure_kind(kind, entity).op(OP_UPDATE)?;
        debug!(kind = %kind, id = entity.id(), "Updating dictionary entity");
        match entity {
            Dictionary::Brand(e) => self.replace(e).await,
            Dictionary::Category(e) => self.replace(e).await,
            Dictionary::Country(e) => self.replace(e).await,
            Dictionary::Material(e) => self.replace(e).await,
            Dictionary::Color(e) => self.replace(e).await,
            Dictionary::Slide(e) => self.replace(e).await,
            Dictionary::Article(e) => self.replace(e).await,
        }
        .op(OP_UPDATE)
    }

    /// Delete entity of `kind` by ID
    ///
    /// Fails with `ForeignKeyViolation` while a product still references it.
    pub async fn delete(&mut self, kind: DictionaryKind, id: &str) -> Result<()> {
        debug!(kind = %kind, id, "Deleting dictionary entity");
        match kind {
            DictionaryKind::Brand => self.delete_of::<Brand>(id).await,
            DictionaryKind::Category => self.delete_of::<Category>(id).await,
            DictionaryKind::Country => self.delete_of::<Country>(id).await,
            DictionaryKind::Material => self.delete_of::<Material>(id).await,
            DictionaryKind::Color => self.delete_of::<Color>(id).await,
            DictionaryKind::Slide => self.delete_of::<Slide>(id).await,
            DictionaryKind::Article => self.delete_of::<Article>(id).await,
        }
        .op(OP_DELETE)
    }

    async fn list_of<E: DictionaryRecord>(
        &mut self,
    ) -> std::result::Result<Vec<Dictionary>, RepositoryError> {
        let sql = select_all_sql::<E>();
        let scope = &mut self.scope;
        within_deadline(self.deadline, async move {
            let mut conn = scope.conn().await?;
            let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
            let entities = scan_many::<E>(&rows)?;
            Ok(entities.into_iter().map(E::into_dictionary).collect())
        })
        .await
    }

    async fn get_of<E: DictionaryRecord>(
        &mut self,
        id: &str,
    ) -> std::result::Result<Dictionary, RepositoryError> {
        let sql = select_one_sql::<E>();
        let scope = &mut self.scope;
        within_deadline(self.deadline, async move {
            let mut conn = scope.conn().await?;
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
            Ok(scan_one::<E>(row)?.into_dictionary())
        })
        .await
    }

    async fn insert<E: DictionaryRecord>(
        &mut self,
        entity: &E,
    ) -> std::result::Result<(), RepositoryError> {
        let sql = insert_sql::<E>();
        let mut conn = self.scope.conn().await?;
        entity
            .bind_columns(sqlx::query(&sql))
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn replace<E: DictionaryRecord>(
        &mut self,
        entity: &E,
    ) -> std::result::Result<(), RepositoryError> {
        let sql = update_sql::<E>();
        let mut conn = self.scope.conn().await?;
        let result = entity
            .bind_columns(sqlx::query(&sql))
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_of<E: DictionaryRecord>(
        &mut self,
        id: &str,
    ) -> std::result::Result<(), RepositoryError> {
        let sql = delete_sql::<E>();
        let mut conn = self.scope.conn().await?;
        let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// The payload must be of the kind the call names
fn ensure_kind(kind: DictionaryKind, entity: &Dictionary) -> std::result::Result<(), RepositoryError> {
    if entity.kind() != kind {
        return Err(RepositoryError::InvalidType {
            expected: kind.as_str(),
            found: entity.kind().as_str(),
        });
    }
    Ok(())
}
