use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{
        GroupPageRequest, OrdinalStore, PublicItemsRepo, PublicOrder, RepoError, SiblingPage,
        SiblingQuery, SiblingRequest,
    },
    domain::{
        entities::{ItemId, ItemRecord, Ordinal},
        types::{ItemStatus, SortDirection},
    },
};

use super::{PostgresRepositories, map_sqlx_error, util::convert_count};

const ITEM_COLUMNS: &str =
    "SELECT id, item_type, parent_id, ordinal, title, status, created_at, updated_at FROM items ";

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    item_type: String,
    parent_id: i64,
    ordinal: i32,
    title: String,
    status: ItemStatus,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ItemRow> for ItemRecord {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            item_type: row.item_type,
            parent_id: row.parent_id,
            ordinal: row.ordinal,
            title: row.title,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn push_group_filter<'q>(
    qb: &mut QueryBuilder<'q, Postgres>,
    item_type: &'q str,
    parent_id: ItemId,
    status: ItemStatus,
) {
    qb.push("WHERE item_type = ");
    qb.push_bind(item_type);
    qb.push(" AND parent_id = ");
    qb.push_bind(parent_id);
    qb.push(" AND status = ");
    qb.push_bind(status);
}

fn push_sibling_order(qb: &mut QueryBuilder<'_, Postgres>, direction: SortDirection) {
    let direction = direction.as_str();
    qb.push(format!(
        " ORDER BY ordinal {direction}, title {direction}, id {direction}"
    ));
}

#[async_trait]
impl OrdinalStore for PostgresRepositories {
    async fn set_ordinal(
        &self,
        item_id: ItemId,
        ordinal: Ordinal,
        parent_id: ItemId,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET ordinal = $2,
                parent_id = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(ordinal)
        .bind(parent_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SiblingQuery for PostgresRepositories {
    async fn list_siblings(&self, request: SiblingRequest<'_>) -> Result<SiblingPage, RepoError> {
        let limit = i64::from(request.limit);
        let mut qb = QueryBuilder::new(ITEM_COLUMNS);
        push_group_filter(
            &mut qb,
            request.item_type,
            request.parent_id,
            request.status,
        );
        if !request.exclude.is_empty() {
            qb.push(" AND NOT (id = ANY(");
            qb.push_bind(request.exclude.to_vec());
            qb.push("))");
        }
        push_sibling_order(&mut qb, request.direction);
        qb.push(" LIMIT ");
        qb.push_bind(limit + 1);

        let mut rows = qb
            .build_query_as::<ItemRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = rows.len() as i64 > limit;
        rows.truncate(request.limit as usize);

        Ok(SiblingPage {
            items: rows.into_iter().map(ItemRecord::from).collect(),
            has_more,
        })
    }

    async fn list_page(
        &self,
        request: GroupPageRequest<'_>,
    ) -> Result<Vec<ItemRecord>, RepoError> {
        let offset = i64::try_from(request.offset).map_err(|e| RepoError::InvalidInput {
            message: e.to_string(),
        })?;
        let mut qb = QueryBuilder::new(ITEM_COLUMNS);
        push_group_filter(
            &mut qb,
            request.item_type,
            request.parent_id,
            request.status,
        );
        push_sibling_order(&mut qb, request.direction);
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(request.limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<ItemRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ItemRecord::from).collect())
    }

    async fn count_siblings(
        &self,
        item_type: &str,
        parent_id: ItemId,
        status: ItemStatus,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM items ");
        push_group_filter(&mut qb, item_type, parent_id, status);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn count_items(&self, item_type: &str, status: ItemStatus) -> Result<u64, RepoError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE item_type = $1 AND status = $2")
                .bind(item_type)
                .bind(status)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn find_item(&self, item_id: ItemId) -> Result<Option<ItemRecord>, RepoError> {
        let mut qb = QueryBuilder::new(ITEM_COLUMNS);
        qb.push("WHERE id = ");
        qb.push_bind(item_id);

        let row = qb
            .build_query_as::<ItemRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ItemRecord::from))
    }
}

#[async_trait]
impl PublicItemsRepo for PostgresRepositories {
    async fn list_public(
        &self,
        item_type: &str,
        status: ItemStatus,
        order: PublicOrder,
        limit: u32,
    ) -> Result<Vec<ItemRecord>, RepoError> {
        let mut qb = QueryBuilder::new(ITEM_COLUMNS);
        qb.push("WHERE item_type = ");
        qb.push_bind(item_type);
        qb.push(" AND status = ");
        qb.push_bind(status);

        match order {
            PublicOrder::Ordinal(direction) => {
                let direction = direction.as_str();
                qb.push(format!(" ORDER BY ordinal {direction}, title {direction}"));
            }
            PublicOrder::Date => {
                qb.push(" ORDER BY created_at DESC, id DESC");
            }
        }
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(limit));

        let rows = qb
            .build_query_as::<ItemRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ItemRecord::from).collect())
    }
}
