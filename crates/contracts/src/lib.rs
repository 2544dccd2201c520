//! Общие типы backend и клиентов панели печати этикеток

pub mod domain;
pub mod projections;
pub mod usecases;
