//! Core domain types for the helpdesk engine

mod builders;
mod ids;
mod status;
mod ticket;

pub use builders::TicketInputBuilder;
pub use ids::{
    AttachmentId, DepartmentId, DeviceTypeId, EmployeeId, NotificationId, ProviderId, RatingId,
    TicketId, TicketUpdateId, UserId,
};
pub use status::{Priority, Status, UpdateType, UserType};
pub use ticket::{
    Attachment, CreatedTicket, Rating, StatisticsFilter, Ticket, TicketDetails, TicketFilter,
    TicketInput, TicketStatistics, TicketSummary, TicketUpdate, generate_ticket_number,
    is_ticket_number,
};
