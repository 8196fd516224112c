//! SeaORM-backed store, one database transaction per unit of work

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::debug;

use super::{DepartmentStore, UserDirectory};
use crate::entity::{department, user};

pub struct SeaOrmStore {
    txn: Option<DatabaseTransaction>,
    writes: u64,
}

impl SeaOrmStore {
    /// Open a transaction on `db`; dropping the store without `commit` rolls it back
    pub async fn begin(db: &DatabaseConnection) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        Ok(Self { txn: Some(txn), writes: 0 })
    }

    fn txn(&self) -> Result<&DatabaseTransaction, DbErr> {
        self.txn
            .as_ref()
            .ok_or_else(|| DbErr::Custom("transaction already finished".to_string()))
    }
}

#[async_trait]
impl DepartmentStore for SeaOrmStore {
    async fn load_all_departments(&self) -> Result<Vec<department::Model>, DbErr> {
        department::Entity::find()
            .order_by_asc(department::Column::Id)
            .all(self.txn()?)
            .await
    }

    async fn find_department_by_id(&self, id: i64) -> Result<Option<department::Model>, DbErr> {
        department::Entity::find_by_id(id).one(self.txn()?).await
    }

    async fn any_department_with_name_or_code(
        &self,
        name: &str,
        code: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbErr> {
        let mut query = department::Entity::find().filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(department::Column::Name))).eq(name.to_lowercase()))
                .add(Expr::expr(Func::lower(Expr::col(department::Column::Code))).eq(code.to_lowercase())),
        );
        if let Some(id) = exclude_id {
            query = query.filter(department::Column::Id.ne(id));
        }
        Ok(query.count(self.txn()?).await? > 0)
    }

    async fn any_department_managed_by(
        &self,
        user_id: i64,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbErr> {
        let mut query = department::Entity::find().filter(department::Column::ManagerId.eq(user_id));
        if let Some(id) = exclude_id {
            query = query.filter(department::Column::Id.ne(id));
        }
        Ok(query.count(self.txn()?).await? > 0)
    }

    async fn insert_department(&mut self, model: department::Model) -> Result<i64, DbErr> {
        let mut active = model.into_update();
        active.id = NotSet;
        let inserted = active.insert(self.txn()?).await?;
        self.writes += 1;
        Ok(inserted.id)
    }

    async fn update_department(&mut self, model: department::Model) -> Result<(), DbErr> {
        model.into_update().update(self.txn()?).await?;
        self.writes += 1;
        Ok(())
    }

    async fn delete_department(&mut self, model: department::Model) -> Result<(), DbErr> {
        let result = department::Entity::delete_by_id(model.id).exec(self.txn()?).await?;
        if result.rows_affected == 0 {
            return Err(DbErr::RecordNotFound(format!("department {}", model.id)));
        }
        self.writes += 1;
        Ok(())
    }

    async fn commit(&mut self) -> Result<u64, DbErr> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| DbErr::Custom("transaction already finished".to_string()))?;
        txn.commit().await?;
        debug!("Committed {} writes", self.writes);
        Ok(std::mem::take(&mut self.writes))
    }

    async fn rollback(&mut self) -> Result<(), DbErr> {
        if let Some(txn) = self.txn.take() {
            txn.rollback().await?;
            debug!("Rolled back {} writes", self.writes);
        }
        self.writes = 0;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SeaOrmStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find_by_id(id).one(self.txn()?).await
    }

    async fn detach_users_from_department(&mut self, department_id: i64) -> Result<u64, DbErr> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::DepartmentId, Expr::value(Option::<i64>::None))
            .filter(user::Column::DepartmentId.eq(department_id))
            .exec(self.txn()?)
            .await?;
        self.writes += result.rows_affected;
        Ok(result.rows_affected)
    }
}
