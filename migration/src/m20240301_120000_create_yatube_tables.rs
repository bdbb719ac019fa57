use entity::{comment, follow, group, post, user};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Foreign keys are declared without ON DELETE actions: cascades and
/// set-null are carried out by the application inside its transactions.
fn fk<T, C, R, K>(name: &str, from: (T, C), to: (R, K)) -> ForeignKeyCreateStatement
where
    T: IntoTableRef,
    C: IntoIden,
    R: IntoTableRef,
    K: IntoIden,
{
    ForeignKey::create()
        .name(name)
        .from(from.0, from.1)
        .to(to.0, to.1)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(user::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(user::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(user::Column::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(user::Column::PasswordHash)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(user::Column::ApiToken)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(group::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(group::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(group::Column::Title)
                            .string_len(group::TITLE_MAX_LENGTH as u32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(group::Column::Slug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(group::Column::Description).text().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(post::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(post::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(post::Column::Text).text().not_null())
                    .col(
                        ColumnDef::new(post::Column::PubDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(post::Column::AuthorId).integer().not_null())
                    .col(ColumnDef::new(post::Column::GroupId).integer().null())
                    .col(ColumnDef::new(post::Column::Image).string().null())
                    .foreign_key(&mut fk(
                        "fk_posts_author",
                        (post::Entity, post::Column::AuthorId),
                        (user::Entity, user::Column::Id),
                    ))
                    .foreign_key(&mut fk(
                        "fk_posts_group",
                        (post::Entity, post::Column::GroupId),
                        (group::Entity, group::Column::Id),
                    ))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(comment::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(comment::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(comment::Column::PostId).integer().not_null())
                    .col(
                        ColumnDef::new(comment::Column::AuthorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(comment::Column::Text).text().not_null())
                    .col(
                        ColumnDef::new(comment::Column::Created)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut fk(
                        "fk_comments_post",
                        (comment::Entity, comment::Column::PostId),
                        (post::Entity, post::Column::Id),
                    ))
                    .foreign_key(&mut fk(
                        "fk_comments_author",
                        (comment::Entity, comment::Column::AuthorId),
                        (user::Entity, user::Column::Id),
                    ))
                    .to_owned(),
            )
            .await?;
        // The composite primary key is the unique (user, author) pair.
        manager
            .create_table(
                Table::create()
                    .table(follow::Entity)
                    .if_not_exists()
                    .col(ColumnDef::new(follow::Column::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(follow::Column::AuthorId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("unique_user_author_pair")
                            .col(follow::Column::UserId)
                            .col(follow::Column::AuthorId),
                    )
                    .check(
                        Expr::col(follow::Column::UserId).ne(Expr::col(follow::Column::AuthorId)),
                    )
                    .foreign_key(&mut fk(
                        "fk_follows_user",
                        (follow::Entity, follow::Column::UserId),
                        (user::Entity, user::Column::Id),
                    ))
                    .foreign_key(&mut fk(
                        "fk_follows_author",
                        (follow::Entity, follow::Column::AuthorId),
                        (user::Entity, user::Column::Id),
                    ))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(follow::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(comment::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(post::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(group::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(user::Entity).to_owned())
            .await
    }
}
