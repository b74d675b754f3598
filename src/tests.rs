//! Integration tests for the DABRO portal backend.

use std::sync::Arc;

use reqwest::multipart;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::feed::MessageFeed;
use crate::storage::Storage;
use crate::{create_router, seed_admin, AppState};

const ADMIN_EMAIL: &str = "admin@darulabror.com";
const ADMIN_PASSWORD: &str = "admin-rahasia";
const WALI_PASSWORD: &str = "rahasia123";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let storage_path = temp_dir.path().join("storage");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Bind first so the public base URL matches the served address
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        let config = Config {
            db_path,
            storage_path: storage_path.clone(),
            public_base_url: base_url.clone(),
            bind_addr: addr,
            log_level: "warn".to_string(),
            auth_pepper: "test-pepper".to_string(),
            session_ttl_hours: 1,
            admin_email: ADMIN_EMAIL.to_string(),
            admin_password: Some(ADMIN_PASSWORD.to_string()),
        };

        tokio::fs::create_dir_all(&storage_path).await.unwrap();
        let storage = Arc::new(Storage::new(storage_path, base_url.clone()));

        let state = AppState {
            repo,
            storage,
            feed: MessageFeed::new(),
            config: Arc::new(config),
        };

        seed_admin(&state).await.expect("Failed to seed admin");

        let app = create_router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "login failed for {}", email);
        let body: Value = resp.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Register a guardian account and return (token, user id).
    async fn register_wali(&self, nama: &str, email: &str, nama_anak: &str) -> (String, String) {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "nama": nama,
                "email": email,
                "password": WALI_PASSWORD,
                "confirmPassword": WALI_PASSWORD,
                "namaAnak": nama_anak,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "register failed for {}", email);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["user"]["role"], "wali");
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// First santri id visible to the given token.
    async fn first_santri_id(&self, token: &str) -> String {
        let body: Value = self
            .client
            .get(self.url("/api/santri"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["data"]["items"][0]["id"].as_str().unwrap().to_string()
    }

    /// Create a jenis and a pembayaran for the santri, returning the payment id.
    async fn create_pembayaran(&self, admin: &str, santri_id: &str) -> String {
        let jenis: Value = self
            .client
            .post(self.url("/api/pembayaran/jenis"))
            .bearer_auth(admin)
            .json(&json!({ "namaPembayaran": "SPP", "jumlahDefault": 350000 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let jenis_id = jenis["data"]["id"].as_str().unwrap();

        let resp = self
            .client
            .post(self.url("/api/pembayaran"))
            .bearer_auth(admin)
            .json(&json!({
                "santriId": santri_id,
                "jenisId": jenis_id,
                "periode": "Agustus 2026",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["status"], "belum");
        assert_eq!(body["data"]["jumlah"], 350000);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

fn bukti_form() -> multipart::Form {
    multipart::Form::new()
        .text("metode", "Transfer Bank")
        .part(
            "bukti",
            multipart::Part::bytes(b"fake-transfer-receipt".to_vec()).file_name("bukti.jpg"),
        )
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_requests_require_token() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/santri"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({
            "nama": "Budi",
            "email": "budi@example.com",
            "password": "abc",
            "confirmPassword": "abc",
            "namaAnak": "Ahmad",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Password minimal 6 karakter");

    // The rejected form created no account
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "budi@example.com", "password": "abc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_register_rejects_password_mismatch() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({
            "nama": "Budi",
            "email": "budi@example.com",
            "password": "rahasia123",
            "confirmPassword": "rahasia124",
            "namaAnak": "Ahmad",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "Password dan konfirmasi password tidak sama"
    );
}

#[tokio::test]
async fn test_register_creates_wali_with_child() {
    let fixture = TestFixture::new().await;

    let (token, wali_id) = fixture
        .register_wali("Budi Santoso", "budi@example.com", "Ahmad Santoso")
        .await;

    let body: Value = fixture
        .client
        .get(fixture.url("/api/santri"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["nama"], "Ahmad Santoso");
    assert_eq!(body["data"]["items"][0]["waliId"], wali_id);

    // Duplicate email is refused
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({
            "nama": "Budi Kedua",
            "email": "budi@example.com",
            "password": "rahasia123",
            "confirmPassword": "rahasia123",
            "namaAnak": "Fatimah",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Email sudah terdaftar");

    // The refused registration left no stray child record behind
    let admin = fixture.admin_token().await;
    let body: Value = fixture
        .client
        .get(fixture.url("/api/santri"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "salah-total" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Email atau password salah");
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_wali_cannot_use_admin_routes() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/keaktifan"))
        .bearer_auth(&token)
        .json(&json!({
            "santriId": "whatever",
            "namaKegiatan": "Kajian Subuh",
            "tanggalKegiatan": "2026-08-01",
            "kategori": "kajian",
            "status": "hadir",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    assert_eq!(body["error"]["message"], "Operasi ini hanya untuk admin");
}

#[tokio::test]
async fn test_santri_roster_scoped_per_wali() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let (wali1, wali1_id) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;
    let (wali2, _) = fixture
        .register_wali("Siti", "siti@example.com", "Fatimah")
        .await;

    // Admin sees both children
    let body: Value = fixture
        .client
        .get(fixture.url("/api/santri"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 2);

    // Each guardian sees exactly their own
    let body: Value = fixture
        .client
        .get(fixture.url("/api/santri"))
        .bearer_auth(&wali1)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["nama"], "Ahmad");
    assert_eq!(body["data"]["items"][0]["waliId"], wali1_id);

    // A foreign santri detail reads as not found
    let foreign_id = fixture.first_santri_id(&wali1).await;
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/santri/{}", foreign_id)))
        .bearer_auth(&wali2)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_berita_crud_and_draft_visibility() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let (wali, _) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;

    // Draft, no image
    let form = multipart::Form::new()
        .text("judul", "Jadwal Kajian")
        .text("konten", "Segera diumumkan")
        .text("status", "draft");
    let resp = fixture
        .client
        .post(fixture.url("/api/berita"))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let draft: Value = resp.json().await.unwrap();
    let draft_id = draft["data"]["id"].as_str().unwrap().to_string();

    // Published, with image
    let form = multipart::Form::new()
        .text("judul", "Wisuda Tahfidz")
        .text("konten", "Alhamdulillah 12 santri menyelesaikan hafalan")
        .text("status", "publish")
        .part(
            "gambar",
            multipart::Part::bytes(b"fake-image-bytes".to_vec()).file_name("wisuda.jpg"),
        );
    let resp = fixture
        .client
        .post(fixture.url("/api/berita"))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let published: Value = resp.json().await.unwrap();
    let published_id = published["data"]["id"].as_str().unwrap().to_string();
    let gambar_url = published["data"]["gambarUrl"].as_str().unwrap().to_string();

    // The stored image is served back at its public URL
    let resp = fixture.client.get(&gambar_url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"fake-image-bytes");

    // Guardian list contains only the published item
    let body: Value = fixture
        .client
        .get(fixture.url("/api/berita"))
        .bearer_auth(&wali)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["judul"], "Wisuda Tahfidz");
    assert_eq!(body["data"]["items"][0]["adminNama"], "Admin Pesantren");

    // Draft detail is hidden from the guardian, visible to admin
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/berita/{}", draft_id)))
        .bearer_auth(&wali)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/berita/{}", draft_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Update without a new image keeps the stored URL
    let form = multipart::Form::new().text("judul", "Wisuda Tahfidz Angkatan 12");
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/berita/{}", published_id)))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["judul"], "Wisuda Tahfidz Angkatan 12");
    assert_eq!(
        updated["data"]["konten"].as_str(),
        published["data"]["konten"].as_str()
    );
    assert_eq!(updated["data"]["gambarUrl"], gambar_url.as_str());
}

#[tokio::test]
async fn test_berita_double_delete_returns_404() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let form = multipart::Form::new()
        .text("judul", "Pengumuman")
        .text("konten", "Isi pengumuman")
        .text("status", "publish");
    let created: Value = fixture
        .client
        .post(fixture.url("/api/berita"))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/berita/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/berita/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_payment_flow() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let (wali, _) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;
    let santri_id = fixture.first_santri_id(&wali).await;
    let pembayaran_id = fixture.create_pembayaran(&admin, &santri_id).await;

    // Guardian sees the obligation with the santri relationship embedded
    let body: Value = fixture
        .client
        .get(fixture.url("/api/pembayaran"))
        .bearer_auth(&wali)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["santriNama"], "Ahmad");
    assert_eq!(body["data"]["items"][0]["jenis"], "SPP");

    // Proof is required in the form
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/pembayaran/{}/bukti", pembayaran_id)))
        .bearer_auth(&wali)
        .multipart(multipart::Form::new().text("catatan", "transfer sudah"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Bukti pembayaran wajib dilampirkan");

    // Submit proof: belum -> pending, URL attached
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/pembayaran/{}/bukti", pembayaran_id)))
        .bearer_auth(&wali)
        .multipart(bukti_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["metode"], "Transfer Bank");
    assert!(body["data"]["buktiUrl"].as_str().unwrap().contains("/files/bukti/"));

    // The detail view shows the submitted proof and method
    let detail: Value = fixture
        .client
        .get(fixture.url(&format!("/api/pembayaran/{}", pembayaran_id)))
        .bearer_auth(&wali)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["status"], "pending");
    assert_eq!(detail["data"]["metode"], "Transfer Bank");
    assert_eq!(detail["data"]["santriNama"], "Ahmad");

    // Second submission is refused while pending
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/pembayaran/{}/bukti", pembayaran_id)))
        .bearer_auth(&wali)
        .multipart(bukti_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "Bukti pembayaran sudah dikirim, menunggu verifikasi admin"
    );

    // Admin approves
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/pembayaran/{}/verify", pembayaran_id)))
        .bearer_auth(&admin)
        .json(&json!({ "status": "lunas" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "lunas");

    // A settled payment refuses further proof
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/pembayaran/{}/bukti", pembayaran_id)))
        .bearer_auth(&wali)
        .multipart(bukti_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Pembayaran sudah lunas");
}

#[tokio::test]
async fn test_payment_proof_only_by_owner() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let (wali1, _) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;
    let (wali2, _) = fixture
        .register_wali("Siti", "siti@example.com", "Fatimah")
        .await;

    let santri_id = fixture.first_santri_id(&wali1).await;
    let pembayaran_id = fixture.create_pembayaran(&admin, &santri_id).await;

    // The other guardian does not see it
    let body: Value = fixture
        .client
        .get(fixture.url("/api/pembayaran"))
        .bearer_auth(&wali2)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 0);

    // The foreign detail reads as not found
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/pembayaran/{}", pembayaran_id)))
        .bearer_auth(&wali2)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Nor may they submit proof for it
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/pembayaran/{}/bukti", pembayaran_id)))
        .bearer_auth(&wali2)
        .multipart(bukti_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Pembayaran ini bukan milik santri Anda");
}

#[tokio::test]
async fn test_keaktifan_scoped_per_wali() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let (wali1, _) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;
    let (wali2, _) = fixture
        .register_wali("Siti", "siti@example.com", "Fatimah")
        .await;
    let santri_id = fixture.first_santri_id(&wali1).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/keaktifan"))
        .bearer_auth(&admin)
        .json(&json!({
            "santriId": santri_id,
            "namaKegiatan": "Kajian Subuh",
            "tanggalKegiatan": "2026-08-01",
            "kategori": "kajian",
            "status": "hadir",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = fixture
        .client
        .get(fixture.url("/api/keaktifan"))
        .bearer_auth(&wali1)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["santriNama"], "Ahmad");
    assert_eq!(body["data"]["items"][0]["status"], "hadir");

    let body: Value = fixture
        .client
        .get(fixture.url("/api/keaktifan"))
        .bearer_auth(&wali2)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_chat_flow() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let (wali1, wali1_id) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;
    let (_, wali2_id) = fixture
        .register_wali("Siti", "siti@example.com", "Fatimah")
        .await;

    let admin_me: Value = fixture
        .client
        .get(fixture.url("/api/auth/me"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let admin_id = admin_me["data"]["id"].as_str().unwrap().to_string();

    // Guardian-to-guardian threads are refused
    let resp = fixture
        .client
        .post(fixture.url("/api/chat"))
        .bearer_auth(&wali1)
        .json(&json!({ "receiverId": wali2_id, "message": "halo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Wali hanya dapat mengirim pesan ke admin");

    // Guardian writes to staff, staff replies
    let resp = fixture
        .client
        .post(fixture.url("/api/chat"))
        .bearer_auth(&wali1)
        .json(&json!({ "receiverId": admin_id, "message": "Assalamualaikum" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let sent: Value = resp.json().await.unwrap();
    let message_id = sent["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(sent["data"]["isEdited"], false);

    let resp = fixture
        .client
        .post(fixture.url("/api/chat"))
        .bearer_auth(&admin)
        .json(&json!({ "receiverId": wali1_id, "message": "Waalaikumsalam" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Both sides read the same thread, oldest first
    let thread: Value = fixture
        .client
        .get(fixture.url(&format!("/api/chat/{}", admin_id)))
        .bearer_auth(&wali1)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = thread["data"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["message"], "Assalamualaikum");
    assert_eq!(messages[1]["message"], "Waalaikumsalam");

    // Edit own message in place
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/chat/messages/{}", message_id)))
        .bearer_auth(&wali1)
        .json(&json!({ "message": "Assalamualaikum, Ustadz" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let edited: Value = resp.json().await.unwrap();
    assert_eq!(edited["data"]["message"], "Assalamualaikum, Ustadz");
    assert_eq!(edited["data"]["isEdited"], true);

    // Only the sender may edit or delete
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/chat/messages/{}", message_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Staff console lists the guardian with the latest exchange
    let summaries: Value = fixture
        .client
        .get(fixture.url("/api/chat"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = summaries["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["userId"], wali1_id);
    assert_eq!(entries[0]["nama"], "Budi");
    assert_eq!(entries[0]["lastMessage"], "Waalaikumsalam");

    // Delete then refetch excludes the message
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/chat/messages/{}", message_id)))
        .bearer_auth(&wali1)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let thread: Value = fixture
        .client
        .get(fixture.url(&format!("/api/chat/{}", admin_id)))
        .bearer_auth(&wali1)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thread["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_chat_poll_delivers_message() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let (wali, _) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;

    let admin_me: Value = fixture
        .client
        .get(fixture.url("/api/auth/me"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let admin_id = admin_me["data"]["id"].as_str().unwrap().to_string();

    // Open the long poll before sending
    let poll = {
        let client = fixture.client.clone();
        let url = fixture.url("/api/chat/poll?timeoutMs=3000");
        let admin = admin.clone();
        tokio::spawn(async move {
            client
                .get(url)
                .bearer_auth(admin)
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        })
    };

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/chat"))
        .bearer_auth(&wali)
        .json(&json!({ "receiverId": admin_id, "message": "mohon info SPP" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body = poll.await.unwrap();
    assert_eq!(body["data"]["message"], "mohon info SPP");
    assert_eq!(body["data"]["receiverId"], admin_id);
}

#[tokio::test]
async fn test_chat_poll_times_out_null() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let body: Value = fixture
        .client
        .get(fixture.url("/api/chat/poll?timeoutMs=200"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_profile_update_preserves_photo() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;

    let form = multipart::Form::new().text("noHp", "081234567890").part(
        "foto",
        multipart::Part::bytes(b"fake-avatar".to_vec()).file_name("budi.png"),
    );
    let resp = fixture
        .client
        .put(fixture.url("/api/profile"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let foto_url = body["data"]["fotoUrl"].as_str().unwrap().to_string();
    assert!(foto_url.contains("/files/avatars/"));

    // Updating without a new photo keeps the stored URL
    let form = multipart::Form::new().text("alamat", "Jl. Pesantren No. 1");
    let resp = fixture
        .client
        .put(fixture.url("/api/profile"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["fotoUrl"], foto_url.as_str());
    assert_eq!(body["data"]["noHp"], "081234567890");
    assert_eq!(body["data"]["alamat"], "Jl. Pesantren No. 1");

    // Profile view includes the linked santri
    let body: Value = fixture
        .client
        .get(fixture.url("/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["user"]["nama"], "Budi");
    assert_eq!(body["data"]["santri"][0]["nama"], "Ahmad");
}

#[tokio::test]
async fn test_users_admin_console() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    // Create a staff account
    let resp = fixture
        .client
        .post(fixture.url("/api/users"))
        .bearer_auth(&admin)
        .json(&json!({
            "nama": "Ustadz Hasan",
            "email": "hasan@darulabror.com",
            "password": "rahasia123",
            "role": "wali",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let created: Value = resp.json().await.unwrap();
    let user_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["role"], "wali");

    // Promote to admin, then the new credentials work on admin routes
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/users/{}/role", user_id)))
        .bearer_auth(&admin)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let promoted: Value = resp.json().await.unwrap();
    assert_eq!(promoted["data"]["role"], "admin");

    let hasan = fixture.login("hasan@darulabror.com", "rahasia123").await;
    let body: Value = fixture
        .client
        .get(fixture.url("/api/users"))
        .bearer_auth(&hasan)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 2);

    // Deleting your own account is refused
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/users/{}", user_id)))
        .bearer_auth(&hasan)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Tidak dapat menghapus akun sendiri");

    // The original admin can remove it
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/users/{}", user_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_user_permissions_round_trip() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    // The seeded admin carries full module access
    let me: Value = fixture
        .client
        .get(fixture.url("/api/auth/me"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["permissions"]["berita"], true);
    assert_eq!(me["data"]["permissions"]["pembayaran"], true);
    assert_eq!(me["data"]["permissions"]["users"], true);

    // Create a staff account with a partial grant
    let resp = fixture
        .client
        .post(fixture.url("/api/users"))
        .bearer_auth(&admin)
        .json(&json!({
            "nama": "Ustadzah Aminah",
            "email": "aminah@darulabror.com",
            "password": "rahasia123",
            "role": "admin",
            "permissions": {
                "berita": true,
                "keaktifan": true,
            },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let created: Value = resp.json().await.unwrap();
    let user_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["permissions"]["berita"], true);
    assert_eq!(created["data"]["permissions"]["keaktifan"], true);
    assert_eq!(created["data"]["permissions"]["pembayaran"], false);

    // The flags survive a fetch through the console list
    let body: Value = fixture
        .client
        .get(fixture.url("/api/users?q=aminah"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["permissions"]["keaktifan"], true);
    assert_eq!(body["data"]["items"][0]["permissions"]["santri"], false);

    // An update without permissions keeps the stored flags
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/users/{}", user_id)))
        .bearer_auth(&admin)
        .json(&json!({ "noHp": "081234567890" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["permissions"]["berita"], true);
    assert_eq!(updated["data"]["noHp"], "081234567890");

    // An update with permissions replaces them wholesale
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/users/{}", user_id)))
        .bearer_auth(&admin)
        .json(&json!({ "permissions": { "pembayaran": true } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["permissions"]["pembayaran"], true);
    assert_eq!(updated["data"]["permissions"]["berita"], false);

    // A guardian account has no flags at all
    let (_, wali_id) = fixture
        .register_wali("Budi", "budi@example.com", "Ahmad")
        .await;
    let body: Value = fixture
        .client
        .get(fixture.url("/api/users"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let wali_row = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["id"] == wali_id.as_str())
        .unwrap();
    assert!(wali_row["permissions"].is_null());
}

#[tokio::test]
async fn test_berita_search_and_pagination() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    for judul in ["Kajian Subuh", "Kajian Maghrib", "Lomba Pidato"] {
        let form = multipart::Form::new()
            .text("judul", judul)
            .text("konten", "Pengumuman kegiatan")
            .text("status", "publish");
        let resp = fixture
            .client
            .post(fixture.url("/api/berita"))
            .bearer_auth(&admin)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let body: Value = fixture
        .client
        .get(fixture.url("/api/berita?q=kajian&perPage=1&page=2"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert!(body["data"]["items"][0]["judul"]
        .as_str()
        .unwrap()
        .contains("Kajian"));
}
