//! Business logic services

pub mod approval;
pub mod audit;
pub mod inventory;
pub mod medicine;
pub mod purchase;
pub mod returns;
pub mod sale;
pub mod stock_lot;
pub mod supplier;

pub use approval::ApprovalService;
pub use audit::AuditService;
pub use inventory::InventoryService;
pub use medicine::MedicineService;
pub use purchase::PurchaseService;
pub use returns::ReturnService;
pub use sale::SaleService;
pub use stock_lot::StockLotService;
pub use supplier::SupplierService;
