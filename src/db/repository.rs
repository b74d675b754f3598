//! Database repository for CRUD operations.
//!
//! Uses prepared statements and keeps all row scoping (guardian visibility)
//! in SQL rather than trusting callers to filter.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Berita, BeritaStatus, ChatSummary, CreateJenisRequest, CreateKeaktifanRequest,
    CreatePembayaranRequest, JenisPembayaran, Keaktifan, KehadiranStatus, Message, NewSantri,
    Pembayaran, PembayaranStatus, Permissions, Role, Santri, UpdateKeaktifanRequest,
    UpdateUserRequest, UserAccount,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

/// Stored credential material for one account.
pub struct Credentials {
    pub password_hash: String,
    pub salt: String,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Create an account with an explicit role claim.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_user(
        &self,
        nama: &str,
        email: &str,
        no_hp: Option<&str>,
        alamat: Option<&str>,
        role: Role,
        permissions: Option<&Permissions>,
        password_hash: &str,
        salt: &str,
    ) -> Result<UserAccount, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let permissions_json = permissions_to_json(permissions)?;

        sqlx::query(
            "INSERT INTO users (id, nama, email, no_hp, alamat, role, permissions, password_hash, salt, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(nama)
        .bind(email)
        .bind(no_hp)
        .bind(alamat)
        .bind(role.as_str())
        .bind(&permissions_json)
        .bind(password_hash)
        .bind(salt)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_unique_email)?;

        Ok(UserAccount {
            id,
            nama: nama.to_string(),
            email: email.to_string(),
            no_hp: no_hp.map(str::to_string),
            alamat: alamat.map(str::to_string),
            foto_url: None,
            role,
            permissions: permissions.copied(),
            created_at: now,
        })
    }

    /// Guardian self-registration: the account and the child's santri row are
    /// inserted in one transaction, so a failure leaves neither behind.
    pub async fn create_wali_with_santri(
        &self,
        nama: &str,
        email: &str,
        no_hp: Option<&str>,
        alamat: Option<&str>,
        password_hash: &str,
        salt: &str,
        child: &NewSantri,
    ) -> Result<(UserAccount, Santri), AppError> {
        let user_id = uuid::Uuid::new_v4().to_string();
        let santri_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, nama, email, no_hp, alamat, role, password_hash, salt, created_at) \
             VALUES (?, ?, ?, ?, ?, 'wali', ?, ?, ?)",
        )
        .bind(&user_id)
        .bind(nama)
        .bind(email)
        .bind(no_hp)
        .bind(alamat)
        .bind(password_hash)
        .bind(salt)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_email)?;

        sqlx::query(
            "INSERT INTO santri (id, nama, tgl_lahir, alamat, kelas, kamar, wali_id, foto_url, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&santri_id)
        .bind(&child.nama)
        .bind(&child.tgl_lahir)
        .bind(&child.alamat)
        .bind(&child.kelas)
        .bind(&child.kamar)
        .bind(&user_id)
        .bind(&child.foto_url)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let user = UserAccount {
            id: user_id.clone(),
            nama: nama.to_string(),
            email: email.to_string(),
            no_hp: no_hp.map(str::to_string),
            alamat: alamat.map(str::to_string),
            foto_url: None,
            role: Role::Wali,
            permissions: None,
            created_at: now.clone(),
        };
        let santri = Santri {
            id: santri_id,
            nama: child.nama.clone(),
            tgl_lahir: child.tgl_lahir.clone(),
            alamat: child.alamat.clone(),
            kelas: child.kelas.clone(),
            kamar: child.kamar.clone(),
            wali_id: Some(user_id),
            foto_url: child.foto_url.clone(),
            created_at: now,
        };
        Ok((user, santri))
    }

    /// Get an account by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<UserAccount>, AppError> {
        let row = sqlx::query(
            "SELECT id, nama, email, no_hp, alamat, foto_url, role, permissions, created_at \
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get an account and its stored credentials by email.
    pub async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(UserAccount, Credentials)>, AppError> {
        let row = sqlx::query(
            "SELECT id, nama, email, no_hp, alamat, foto_url, role, permissions, password_hash, salt, created_at \
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let creds = Credentials {
                password_hash: row.get("password_hash"),
                salt: row.get("salt"),
            };
            (user_from_row(&row), creds)
        }))
    }

    /// List all accounts, newest first.
    pub async fn list_users(&self) -> Result<Vec<UserAccount>, AppError> {
        let rows = sqlx::query(
            "SELECT id, nama, email, no_hp, alamat, foto_url, role, permissions, created_at \
             FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// True when at least one admin account exists.
    pub async fn has_admin(&self) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n") > 0)
    }

    /// Update account fields from the admin console; absent fields are preserved.
    pub async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<UserAccount, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let nama = request.nama.as_ref().unwrap_or(&existing.nama);
        let no_hp = request.no_hp.clone().or(existing.no_hp.clone());
        let alamat = request.alamat.clone().or(existing.alamat.clone());
        let permissions = request.permissions.or(existing.permissions);
        let permissions_json = permissions_to_json(permissions.as_ref())?;

        sqlx::query("UPDATE users SET nama = ?, no_hp = ?, alamat = ?, permissions = ? WHERE id = ?")
            .bind(nama)
            .bind(&no_hp)
            .bind(&alamat)
            .bind(&permissions_json)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(UserAccount {
            nama: nama.clone(),
            no_hp,
            alamat,
            permissions,
            ..existing
        })
    }

    /// Update the caller's own profile; `foto_url` is only touched when a new
    /// upload resolved.
    pub async fn update_profile(
        &self,
        id: &str,
        nama: Option<&str>,
        no_hp: Option<&str>,
        alamat: Option<&str>,
        foto_url: Option<&str>,
    ) -> Result<UserAccount, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let nama = nama.unwrap_or(&existing.nama).to_string();
        let no_hp = no_hp.map(str::to_string).or(existing.no_hp.clone());
        let alamat = alamat.map(str::to_string).or(existing.alamat.clone());
        let foto_url = foto_url.map(str::to_string).or(existing.foto_url.clone());

        sqlx::query("UPDATE users SET nama = ?, no_hp = ?, alamat = ?, foto_url = ? WHERE id = ?")
            .bind(&nama)
            .bind(&no_hp)
            .bind(&alamat)
            .bind(&foto_url)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(UserAccount {
            nama,
            no_hp,
            alamat,
            foto_url,
            ..existing
        })
    }

    /// Change an account's role claim.
    pub async fn set_user_role(&self, id: &str, role: Role) -> Result<UserAccount, AppError> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Delete an account. Sessions cascade; santri keep their rows with
    /// `wali_id` cleared.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    pub async fn create_session(
        &self,
        token: &str,
        user_id: &str,
        expires_at: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolve a bearer token to its account, refusing expired sessions.
    pub async fn get_session_user(&self, token: &str) -> Result<Option<UserAccount>, AppError> {
        let row = sqlx::query(
            "SELECT u.id, u.nama, u.email, u.no_hp, u.alamat, u.foto_url, u.role, u.permissions, \
                    u.created_at, s.expires_at \
             FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: String = row.get("expires_at");
        if expires_at.as_str() < Utc::now().to_rfc3339().as_str() {
            // Expired; drop the row so it cannot be replayed
            self.delete_session(token).await?;
            return Ok(None);
        }

        Ok(Some(user_from_row(&row)))
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== SANTRI OPERATIONS ====================

    /// List santri. `wali_id` restricts the result to the guardian's own rows:
    /// exactly the subset with a matching guardian reference, never more.
    pub async fn list_santri(&self, wali_id: Option<&str>) -> Result<Vec<Santri>, AppError> {
        let rows = match wali_id {
            Some(wali) => {
                sqlx::query(
                    "SELECT id, nama, tgl_lahir, alamat, kelas, kamar, wali_id, foto_url, created_at \
                     FROM santri WHERE wali_id = ? ORDER BY nama",
                )
                .bind(wali)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, nama, tgl_lahir, alamat, kelas, kamar, wali_id, foto_url, created_at \
                     FROM santri ORDER BY nama",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(santri_from_row).collect())
    }

    pub async fn get_santri(&self, id: &str) -> Result<Option<Santri>, AppError> {
        let row = sqlx::query(
            "SELECT id, nama, tgl_lahir, alamat, kelas, kamar, wali_id, foto_url, created_at \
             FROM santri WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(santri_from_row))
    }

    pub async fn create_santri(&self, new: &NewSantri) -> Result<Santri, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO santri (id, nama, tgl_lahir, alamat, kelas, kamar, wali_id, foto_url, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.nama)
        .bind(&new.tgl_lahir)
        .bind(&new.alamat)
        .bind(&new.kelas)
        .bind(&new.kamar)
        .bind(&new.wali_id)
        .bind(&new.foto_url)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Santri {
            id,
            nama: new.nama.clone(),
            tgl_lahir: new.tgl_lahir.clone(),
            alamat: new.alamat.clone(),
            kelas: new.kelas.clone(),
            kamar: new.kamar.clone(),
            wali_id: new.wali_id.clone(),
            foto_url: new.foto_url.clone(),
            created_at: now,
        })
    }

    /// Update a santri; absent fields and an absent photo are preserved.
    pub async fn update_santri(
        &self,
        id: &str,
        form: &crate::models::SantriForm,
        foto_url: Option<&str>,
    ) -> Result<Santri, AppError> {
        let existing = self
            .get_santri(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Santri {} not found", id)))?;

        let nama = form.nama.clone().unwrap_or(existing.nama);
        let tgl_lahir = form.tgl_lahir.clone().or(existing.tgl_lahir);
        let alamat = form.alamat.clone().or(existing.alamat);
        let kelas = form.kelas.clone().or(existing.kelas);
        let kamar = form.kamar.clone().or(existing.kamar);
        let wali_id = form.wali_id.clone().or(existing.wali_id);
        let foto_url = foto_url.map(str::to_string).or(existing.foto_url);

        sqlx::query(
            "UPDATE santri SET nama = ?, tgl_lahir = ?, alamat = ?, kelas = ?, kamar = ?, \
             wali_id = ?, foto_url = ? WHERE id = ?",
        )
        .bind(&nama)
        .bind(&tgl_lahir)
        .bind(&alamat)
        .bind(&kelas)
        .bind(&kamar)
        .bind(&wali_id)
        .bind(&foto_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Santri {
            id: existing.id,
            nama,
            tgl_lahir,
            alamat,
            kelas,
            kamar,
            wali_id,
            foto_url,
            created_at: existing.created_at,
        })
    }

    pub async fn delete_santri(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM santri WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Santri {} not found", id)));
        }
        Ok(())
    }

    // ==================== BERITA OPERATIONS ====================

    /// List news with the author name embedded, newest first. When
    /// `only_published` is set, drafts are filtered out in SQL.
    pub async fn list_berita(&self, only_published: bool) -> Result<Vec<Berita>, AppError> {
        let base = "SELECT b.id, b.judul, b.konten, b.status, b.gambar_url, b.admin_id, \
                    u.nama AS admin_nama, b.created_at \
                    FROM berita b LEFT JOIN users u ON u.id = b.admin_id";

        let rows = if only_published {
            sqlx::query(&format!(
                "{} WHERE b.status = 'publish' ORDER BY b.created_at DESC",
                base
            ))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!("{} ORDER BY b.created_at DESC", base))
                .fetch_all(&self.pool)
                .await?
        };

        Ok(rows.iter().map(berita_from_row).collect())
    }

    pub async fn get_berita(&self, id: &str) -> Result<Option<Berita>, AppError> {
        let row = sqlx::query(
            "SELECT b.id, b.judul, b.konten, b.status, b.gambar_url, b.admin_id, \
             u.nama AS admin_nama, b.created_at \
             FROM berita b LEFT JOIN users u ON u.id = b.admin_id WHERE b.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(berita_from_row))
    }

    pub async fn create_berita(
        &self,
        judul: &str,
        konten: &str,
        status: BeritaStatus,
        gambar_url: Option<&str>,
        admin_id: &str,
    ) -> Result<Berita, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO berita (id, judul, konten, status, gambar_url, admin_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(judul)
        .bind(konten)
        .bind(status.as_str())
        .bind(gambar_url)
        .bind(admin_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_berita(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Berita vanished after insert".to_string()))
    }

    /// Update a news item; absent fields and an absent image are preserved.
    pub async fn update_berita(
        &self,
        id: &str,
        form: &crate::models::BeritaForm,
        gambar_url: Option<&str>,
    ) -> Result<Berita, AppError> {
        let existing = self
            .get_berita(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Berita {} not found", id)))?;

        let judul = form.judul.clone().unwrap_or(existing.judul);
        let konten = form.konten.clone().unwrap_or(existing.konten);
        let status = form.status.unwrap_or(existing.status);
        let gambar_url = gambar_url.map(str::to_string).or(existing.gambar_url);

        sqlx::query(
            "UPDATE berita SET judul = ?, konten = ?, status = ?, gambar_url = ? WHERE id = ?",
        )
        .bind(&judul)
        .bind(&konten)
        .bind(status.as_str())
        .bind(&gambar_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_berita(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Berita {} not found", id)))
    }

    pub async fn delete_berita(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM berita WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Berita {} not found", id)));
        }
        Ok(())
    }

    // ==================== PEMBAYARAN OPERATIONS ====================

    const PEMBAYARAN_SELECT: &'static str =
        "SELECT p.id, p.santri_id, s.nama AS santri_nama, s.kelas, s.wali_id, \
         j.nama_pembayaran AS jenis, p.periode, p.jumlah, p.status, \
         p.metode_pembayaran AS metode, p.bukti_url, p.created_at \
         FROM pembayaran p \
         JOIN santri s ON s.id = p.santri_id \
         JOIN jenis_pembayaran j ON j.id = p.jenis_id";

    /// List payments with the santri relationship embedded, newest first.
    /// `wali_id` restricts to payments of the guardian's own santri.
    pub async fn list_pembayaran(&self, wali_id: Option<&str>) -> Result<Vec<Pembayaran>, AppError> {
        let rows = match wali_id {
            Some(wali) => {
                sqlx::query(&format!(
                    "{} WHERE s.wali_id = ? ORDER BY p.created_at DESC",
                    Self::PEMBAYARAN_SELECT
                ))
                .bind(wali)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{} ORDER BY p.created_at DESC",
                    Self::PEMBAYARAN_SELECT
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(pembayaran_from_row).collect())
    }

    pub async fn get_pembayaran(&self, id: &str) -> Result<Option<Pembayaran>, AppError> {
        let row = sqlx::query(&format!("{} WHERE p.id = ?", Self::PEMBAYARAN_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(pembayaran_from_row))
    }

    /// Create a payment obligation in state `belum`.
    pub async fn create_pembayaran(
        &self,
        request: &CreatePembayaranRequest,
    ) -> Result<Pembayaran, AppError> {
        let jenis = self
            .get_jenis(&request.jenis_id)
            .await?
            .ok_or_else(|| AppError::Validation("Jenis pembayaran tidak ditemukan".to_string()))?;

        if self.get_santri(&request.santri_id).await?.is_none() {
            return Err(AppError::Validation("Santri tidak ditemukan".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let jumlah = request.jumlah.unwrap_or(jenis.jumlah_default);

        sqlx::query(
            "INSERT INTO pembayaran (id, santri_id, jenis_id, periode, jumlah, status, created_at) \
             VALUES (?, ?, ?, ?, ?, 'belum', ?)",
        )
        .bind(&id)
        .bind(&request.santri_id)
        .bind(&request.jenis_id)
        .bind(&request.periode)
        .bind(jumlah)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_pembayaran(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Pembayaran vanished after insert".to_string()))
    }

    pub async fn set_pembayaran_status(
        &self,
        id: &str,
        status: PembayaranStatus,
    ) -> Result<Pembayaran, AppError> {
        let result = sqlx::query("UPDATE pembayaran SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Pembayaran {} not found", id)));
        }

        self.get_pembayaran(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pembayaran {} not found", id)))
    }

    /// Attach an uploaded proof (and the chosen payment method) and move the
    /// payment to `pending` in one write.
    pub async fn attach_bukti(
        &self,
        id: &str,
        bukti_url: &str,
        metode: Option<&str>,
    ) -> Result<Pembayaran, AppError> {
        sqlx::query(
            "UPDATE pembayaran SET bukti_url = ?, metode_pembayaran = ?, status = 'pending' \
             WHERE id = ?",
        )
        .bind(bukti_url)
        .bind(metode)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_pembayaran(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pembayaran {} not found", id)))
    }

    pub async fn delete_pembayaran(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM pembayaran WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Pembayaran {} not found", id)));
        }
        Ok(())
    }

    pub async fn list_jenis(&self) -> Result<Vec<JenisPembayaran>, AppError> {
        let rows = sqlx::query(
            "SELECT id, nama_pembayaran, jumlah_default FROM jenis_pembayaran ORDER BY nama_pembayaran",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| JenisPembayaran {
                id: row.get("id"),
                nama_pembayaran: row.get("nama_pembayaran"),
                jumlah_default: row.get("jumlah_default"),
            })
            .collect())
    }

    pub async fn get_jenis(&self, id: &str) -> Result<Option<JenisPembayaran>, AppError> {
        let row = sqlx::query(
            "SELECT id, nama_pembayaran, jumlah_default FROM jenis_pembayaran WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| JenisPembayaran {
            id: row.get("id"),
            nama_pembayaran: row.get("nama_pembayaran"),
            jumlah_default: row.get("jumlah_default"),
        }))
    }

    pub async fn create_jenis(
        &self,
        request: &CreateJenisRequest,
    ) -> Result<JenisPembayaran, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO jenis_pembayaran (id, nama_pembayaran, jumlah_default) VALUES (?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.nama_pembayaran)
        .bind(request.jumlah_default)
        .execute(&self.pool)
        .await?;

        Ok(JenisPembayaran {
            id,
            nama_pembayaran: request.nama_pembayaran.clone(),
            jumlah_default: request.jumlah_default,
        })
    }

    // ==================== KEAKTIFAN OPERATIONS ====================

    const KEAKTIFAN_SELECT: &'static str =
        "SELECT k.id, k.santri_id, s.nama AS santri_nama, s.wali_id, k.nama_kegiatan, \
         k.tanggal_kegiatan, k.kategori, k.status, k.keterangan, k.created_at \
         FROM keaktifan k JOIN santri s ON s.id = k.santri_id";

    /// List activity records with the santri embedded, most recent activity
    /// first. `wali_id` restricts to the guardian's own santri.
    pub async fn list_keaktifan(&self, wali_id: Option<&str>) -> Result<Vec<Keaktifan>, AppError> {
        let rows = match wali_id {
            Some(wali) => {
                sqlx::query(&format!(
                    "{} WHERE s.wali_id = ? ORDER BY k.tanggal_kegiatan DESC",
                    Self::KEAKTIFAN_SELECT
                ))
                .bind(wali)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{} ORDER BY k.tanggal_kegiatan DESC",
                    Self::KEAKTIFAN_SELECT
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(keaktifan_from_row).collect())
    }

    pub async fn get_keaktifan(&self, id: &str) -> Result<Option<Keaktifan>, AppError> {
        let row = sqlx::query(&format!("{} WHERE k.id = ?", Self::KEAKTIFAN_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(keaktifan_from_row))
    }

    pub async fn create_keaktifan(
        &self,
        request: &CreateKeaktifanRequest,
    ) -> Result<Keaktifan, AppError> {
        if self.get_santri(&request.santri_id).await?.is_none() {
            return Err(AppError::Validation("Santri tidak ditemukan".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO keaktifan (id, santri_id, nama_kegiatan, tanggal_kegiatan, kategori, status, keterangan, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.santri_id)
        .bind(&request.nama_kegiatan)
        .bind(&request.tanggal_kegiatan)
        .bind(&request.kategori)
        .bind(request.status.as_str())
        .bind(&request.keterangan)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_keaktifan(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Keaktifan vanished after insert".to_string()))
    }

    pub async fn update_keaktifan(
        &self,
        id: &str,
        request: &UpdateKeaktifanRequest,
    ) -> Result<Keaktifan, AppError> {
        let existing = self
            .get_keaktifan(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Keaktifan {} not found", id)))?;

        let nama_kegiatan = request
            .nama_kegiatan
            .clone()
            .unwrap_or(existing.nama_kegiatan);
        let tanggal_kegiatan = request
            .tanggal_kegiatan
            .clone()
            .unwrap_or(existing.tanggal_kegiatan);
        let kategori = request.kategori.clone().unwrap_or(existing.kategori);
        let status = request.status.unwrap_or(existing.status);
        let keterangan = request.keterangan.clone().or(existing.keterangan);

        sqlx::query(
            "UPDATE keaktifan SET nama_kegiatan = ?, tanggal_kegiatan = ?, kategori = ?, \
             status = ?, keterangan = ? WHERE id = ?",
        )
        .bind(&nama_kegiatan)
        .bind(&tanggal_kegiatan)
        .bind(&kategori)
        .bind(status.as_str())
        .bind(&keterangan)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_keaktifan(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Keaktifan {} not found", id)))
    }

    pub async fn delete_keaktifan(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM keaktifan WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Keaktifan {} not found", id)));
        }
        Ok(())
    }

    // ==================== MESSAGE OPERATIONS ====================

    /// Full message thread between two accounts, server timestamp ascending.
    pub async fn message_thread(&self, a: &str, b: &str) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query(
            "SELECT id, sender_id, receiver_id, message, is_edited, created_at FROM messages \
             WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?) \
             ORDER BY created_at ASC",
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<Message>, AppError> {
        let row = sqlx::query(
            "SELECT id, sender_id, receiver_id, message, is_edited, created_at \
             FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(message_from_row))
    }

    pub async fn insert_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<Message, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, message, is_edited, created_at) \
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(body)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id,
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            message: body.to_string(),
            is_edited: false,
            created_at: now,
        })
    }

    /// In-place edit of the body; marks the message as edited.
    pub async fn edit_message(&self, id: &str, body: &str) -> Result<Message, AppError> {
        sqlx::query("UPDATE messages SET message = ?, is_edited = 1 WHERE id = ?")
            .bind(body)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get_message(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))
    }

    pub async fn delete_message(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }
        Ok(())
    }

    /// Staff console: counterparts the given account has exchanged messages
    /// with, most recent exchange first.
    pub async fn chat_summaries(&self, user_id: &str) -> Result<Vec<ChatSummary>, AppError> {
        let rows = sqlx::query(
            "SELECT m.sender_id, m.receiver_id, m.message, m.created_at, u.id AS other_id, \
                    u.nama AS other_nama \
             FROM messages m \
             JOIN users u ON u.id = CASE WHEN m.sender_id = ? THEN m.receiver_id ELSE m.sender_id END \
             WHERE m.sender_id = ? OR m.receiver_id = ? \
             ORDER BY m.created_at DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        // Newest row per counterpart wins; rows arrive newest-first
        let mut seen = std::collections::HashSet::new();
        let mut summaries = Vec::new();
        for row in rows {
            let other_id: String = row.get("other_id");
            if seen.insert(other_id.clone()) {
                summaries.push(ChatSummary {
                    user_id: other_id,
                    nama: row.get("other_nama"),
                    last_message: row.get("message"),
                    last_at: row.get("created_at"),
                });
            }
        }
        Ok(summaries)
    }
}

// ==================== ROW MAPPERS ====================

fn map_unique_email(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Validation("Email sudah terdaftar".to_string())
        }
        other => other.into(),
    }
}

fn permissions_to_json(permissions: Option<&Permissions>) -> Result<Option<String>, AppError> {
    permissions
        .map(|p| serde_json::to_string(p))
        .transpose()
        .map_err(Into::into)
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> UserAccount {
    let role: String = row.get("role");
    let permissions: Option<String> = row.get("permissions");
    UserAccount {
        id: row.get("id"),
        nama: row.get("nama"),
        email: row.get("email"),
        no_hp: row.get("no_hp"),
        alamat: row.get("alamat"),
        foto_url: row.get("foto_url"),
        role: Role::from_str(&role).unwrap_or(Role::Wali),
        permissions: permissions.and_then(|p| serde_json::from_str(&p).ok()),
        created_at: row.get("created_at"),
    }
}

fn santri_from_row(row: &sqlx::sqlite::SqliteRow) -> Santri {
    Santri {
        id: row.get("id"),
        nama: row.get("nama"),
        tgl_lahir: row.get("tgl_lahir"),
        alamat: row.get("alamat"),
        kelas: row.get("kelas"),
        kamar: row.get("kamar"),
        wali_id: row.get("wali_id"),
        foto_url: row.get("foto_url"),
        created_at: row.get("created_at"),
    }
}

fn berita_from_row(row: &sqlx::sqlite::SqliteRow) -> Berita {
    let status: String = row.get("status");
    Berita {
        id: row.get("id"),
        judul: row.get("judul"),
        konten: row.get("konten"),
        status: BeritaStatus::from_str(&status).unwrap_or(BeritaStatus::Draft),
        gambar_url: row.get("gambar_url"),
        admin_id: row.get("admin_id"),
        admin_nama: row.get("admin_nama"),
        created_at: row.get("created_at"),
    }
}

fn pembayaran_from_row(row: &sqlx::sqlite::SqliteRow) -> Pembayaran {
    let status: String = row.get("status");
    Pembayaran {
        id: row.get("id"),
        santri_id: row.get("santri_id"),
        santri_nama: row.get("santri_nama"),
        kelas: row.get("kelas"),
        wali_id: row.get("wali_id"),
        jenis: row.get("jenis"),
        periode: row.get("periode"),
        jumlah: row.get("jumlah"),
        status: PembayaranStatus::from_str(&status).unwrap_or(PembayaranStatus::Belum),
        metode: row.get("metode"),
        bukti_url: row.get("bukti_url"),
        created_at: row.get("created_at"),
    }
}

fn keaktifan_from_row(row: &sqlx::sqlite::SqliteRow) -> Keaktifan {
    let status: String = row.get("status");
    Keaktifan {
        id: row.get("id"),
        santri_id: row.get("santri_id"),
        santri_nama: row.get("santri_nama"),
        wali_id: row.get("wali_id"),
        nama_kegiatan: row.get("nama_kegiatan"),
        tanggal_kegiatan: row.get("tanggal_kegiatan"),
        kategori: row.get("kategori"),
        status: KehadiranStatus::from_str(&status).unwrap_or(KehadiranStatus::Hadir),
        keterangan: row.get("keterangan"),
        created_at: row.get("created_at"),
    }
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        message: row.get("message"),
        is_edited: row.get::<i64, _>("is_edited") != 0,
        created_at: row.get("created_at"),
    }
}
