use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Bids {
    Table,
    GigId,
    FreelancerId,
    Status,
}

#[derive(DeriveIden)]
enum Gigs {
    Table,
    OwnerId,
    Status,
    Title,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One bid per freelancer per gig. Duplicate inserts fail here.
        manager
            .create_index(
                Index::create()
                    .name("idx_bids_gig_freelancer_unique")
                    .table(Bids::Table)
                    .col(Bids::GigId)
                    .col(Bids::FreelancerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Bids of a gig, optionally by status (owner listing, bulk reject)
        manager
            .create_index(
                Index::create()
                    .name("idx_bids_gig_id_status")
                    .table(Bids::Table)
                    .col(Bids::GigId)
                    .col(Bids::Status)
                    .to_owned(),
            )
            .await?;

        // Bids placed by a freelancer, optionally by status
        manager
            .create_index(
                Index::create()
                    .name("idx_bids_freelancer_id_status")
                    .table(Bids::Table)
                    .col(Bids::FreelancerId)
                    .col(Bids::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gigs_owner_id")
                    .table(Gigs::Table)
                    .col(Gigs::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Public listing of open gigs, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_gigs_status_created_at")
                    .table(Gigs::Table)
                    .col(Gigs::Status)
                    .col(Gigs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gigs_title")
                    .table(Gigs::Table)
                    .col(Gigs::Title)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_bids_gig_freelancer_unique",
            "idx_bids_gig_id_status",
            "idx_bids_freelancer_id_status",
            "idx_gigs_owner_id",
            "idx_gigs_status_created_at",
            "idx_gigs_title",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        Ok(())
    }
}
