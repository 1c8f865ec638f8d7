//! Location hierarchy repository.

use crate::model::location::{BlockId, DistrictId, GeoPoint, Region, StateId, Village, VillageId};
use crate::model::ensure_not_blank;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait LocationRepository {
    fn create_state(&self, name: &str) -> RepoResult<StateId>;
    fn create_district(&self, state_id: StateId, name: &str) -> RepoResult<DistrictId>;
    fn create_block(&self, district_id: DistrictId, name: &str) -> RepoResult<BlockId>;
    fn create_village(
        &self,
        block_id: BlockId,
        name: &str,
        location: Option<GeoPoint>,
    ) -> RepoResult<VillageId>;
    fn list_states(&self) -> RepoResult<Vec<Region>>;
    fn list_districts(&self, state_id: StateId) -> RepoResult<Vec<Region>>;
    fn list_blocks(&self, district_id: DistrictId) -> RepoResult<Vec<Region>>;
    fn list_villages(&self, block_id: BlockId) -> RepoResult<Vec<Village>>;
    fn get_village(&self, id: VillageId) -> RepoResult<Option<Village>>;
}

pub struct SqliteLocationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLocationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn insert_named(&self, sql: &str, parent: Option<i64>, name: &str) -> RepoResult<i64> {
        ensure_not_blank("name", name)?;
        match parent {
            Some(parent_id) => self.conn.execute(sql, params![name.trim(), parent_id])?,
            None => self.conn.execute(sql, params![name.trim()])?,
        };
        Ok(self.conn.last_insert_rowid())
    }

    fn list_regions(&self, sql: &str, parent: Option<i64>) -> RepoResult<Vec<Region>> {
        let mut stmt = self.conn.prepare(sql)?;
        let map_row = |row: &Row<'_>| -> rusqlite::Result<Region> {
            Ok(Region {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: row.get(2)?,
            })
        };
        let rows = match parent {
            Some(parent_id) => stmt.query_map([parent_id], map_row)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }
}

impl LocationRepository for SqliteLocationRepository<'_> {
    fn create_state(&self, name: &str) -> RepoResult<StateId> {
        self.insert_named("INSERT INTO states (name) VALUES (?1);", None, name)
    }

    fn create_district(&self, state_id: StateId, name: &str) -> RepoResult<DistrictId> {
        self.insert_named(
            "INSERT INTO districts (name, state_id) VALUES (?1, ?2);",
            Some(state_id),
            name,
        )
    }

    fn create_block(&self, district_id: DistrictId, name: &str) -> RepoResult<BlockId> {
        self.insert_named(
            "INSERT INTO blocks (name, district_id) VALUES (?1, ?2);",
            Some(district_id),
            name,
        )
    }

    fn create_village(
        &self,
        block_id: BlockId,
        name: &str,
        location: Option<GeoPoint>,
    ) -> RepoResult<VillageId> {
        let village = Village {
            id: 0,
            name: name.trim().to_string(),
            block_id,
            location,
        };
        village.validate()?;

        self.conn.execute(
            "INSERT INTO villages (name, block_id, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                village.name,
                block_id,
                location.map(|point| point.latitude),
                location.map(|point| point.longitude),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_states(&self) -> RepoResult<Vec<Region>> {
        self.list_regions("SELECT id, name, NULL FROM states ORDER BY name, id;", None)
    }

    fn list_districts(&self, state_id: StateId) -> RepoResult<Vec<Region>> {
        self.list_regions(
            "SELECT id, name, state_id FROM districts WHERE state_id = ?1 ORDER BY name, id;",
            Some(state_id),
        )
    }

    fn list_blocks(&self, district_id: DistrictId) -> RepoResult<Vec<Region>> {
        self.list_regions(
            "SELECT id, name, district_id FROM blocks WHERE district_id = ?1 ORDER BY name, id;",
            Some(district_id),
        )
    }

    fn list_villages(&self, block_id: BlockId) -> RepoResult<Vec<Village>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, block_id, latitude, longitude
             FROM villages
             WHERE block_id = ?1
             ORDER BY name, id;",
        )?;
        let mut rows = stmt.query([block_id])?;
        let mut villages = Vec::new();
        while let Some(row) = rows.next()? {
            villages.push(parse_village_row(row)?);
        }
        Ok(villages)
    }

    fn get_village(&self, id: VillageId) -> RepoResult<Option<Village>> {
        let village = self
            .conn
            .query_row(
                "SELECT id, name, block_id, latitude, longitude FROM villages WHERE id = ?1;",
                [id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                    ))
                },
            )
            .optional()?;

        village
            .map(|(id, name, block_id, latitude, longitude)| {
                build_village(id, name, block_id, latitude, longitude)
            })
            .transpose()
    }
}

fn parse_village_row(row: &Row<'_>) -> RepoResult<Village> {
    build_village(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    )
}

fn build_village(
    id: i64,
    name: String,
    block_id: i64,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> RepoResult<Village> {
    if latitude.is_some() != longitude.is_some() {
        return Err(RepoError::InvalidData(format!(
            "village {id} has only one coordinate half"
        )));
    }
    Ok(Village {
        id,
        name,
        block_id,
        location: GeoPoint::from_parts(latitude, longitude),
    })
}
