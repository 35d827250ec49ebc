use daysync_core::remote::FileRemoteStore;
use daysync_core::service::TaskService;
use daysync_core::store::SqliteLocalStore;

pub mod add;
pub mod clear;
pub mod delete;
pub mod done;
pub mod edit;
pub mod list;
pub mod recur;
pub mod sync;
pub mod watch;

pub type Service = TaskService<SqliteLocalStore, FileRemoteStore>;
