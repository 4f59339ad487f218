use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            CREATE TABLE "projects" (
                "uuid" uuid PRIMARY KEY,
                "name" varchar,
                "created_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc')
            );

            CREATE TABLE "conversations" (
                "uuid" uuid PRIMARY KEY,
                "project_uuid" uuid NOT NULL REFERENCES "projects"("uuid") ON DELETE CASCADE,
                "contact_urn" varchar NOT NULL,
                "contact_name" varchar,
                "channel_uuid" uuid,
                "external_id" varchar,
                "start_date" timestamp,
                "end_date" timestamp,
                "has_chats_room" boolean NOT NULL DEFAULT false,
                "csat" smallint,
                "nps" integer,
                "resolution" smallint NOT NULL DEFAULT 2,
                "created_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc')
            );

            CREATE INDEX "conversations_registry_lookup" ON "conversations"
                ("project_uuid", "contact_urn", "start_date", "end_date", "channel_uuid");

            CREATE TABLE "conversation_messages" (
                "conversation_uuid" uuid PRIMARY KEY REFERENCES "conversations"("uuid") ON DELETE CASCADE,
                "messages" jsonb NOT NULL DEFAULT '[]'::jsonb,
                "created_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc'),
                "updated_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc')
            );

            CREATE TABLE "topics" (
                "uuid" uuid PRIMARY KEY,
                "project_uuid" uuid NOT NULL REFERENCES "projects"("uuid") ON DELETE CASCADE,
                "name" varchar NOT NULL,
                "description" text,
                "is_active" boolean NOT NULL DEFAULT true,
                "created_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc'),
                "updated_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc')
            );

            CREATE TABLE "subtopics" (
                "uuid" uuid PRIMARY KEY,
                "topic_uuid" uuid NOT NULL REFERENCES "topics"("uuid") ON DELETE CASCADE,
                "name" varchar NOT NULL,
                "description" text,
                "is_active" boolean NOT NULL DEFAULT true,
                "created_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc'),
                "updated_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc')
            );

            CREATE TABLE "conversation_classifications" (
                "conversation_uuid" uuid PRIMARY KEY REFERENCES "conversations"("uuid") ON DELETE CASCADE,
                "topic_uuid" uuid REFERENCES "topics"("uuid") ON DELETE SET NULL,
                "subtopic_uuid" uuid REFERENCES "subtopics"("uuid") ON DELETE SET NULL,
                "confidence" double precision NOT NULL DEFAULT 0.0,
                "created_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc'),
                "updated_at" timestamp NOT NULL DEFAULT (now() at time zone 'utc')
            );

            COMMENT ON TABLE "conversations" IS 'Conversation lifecycle rows, resolution: 0=resolved, 1=unresolved, 2=in progress, 3=unclassified, 4=has chat room';

            COMMENT ON TABLE "conversation_messages" IS 'Messages archived from the hot store when a conversation closes';
        "#;
        crate::from_sql(manager, sql).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            DROP TABLE "conversation_classifications";
            DROP TABLE "subtopics";
            DROP TABLE "topics";
            DROP TABLE "conversation_messages";
            DROP TABLE "conversations";
            DROP TABLE "projects";
        "#;
        crate::from_sql(manager, sql).await
    }
}
