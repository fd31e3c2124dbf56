pub mod company_cache;
