use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::Ipv4Addr;
use std::str::FromStr;

pub fn query_message(id: u16, name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(Name::from_str(name).unwrap(), record_type));
    message
}

/// Builds an upstream answer that echoes the request's ID and questions.
pub fn answer_for(request: &[u8], ip: Ipv4Addr) -> Vec<u8> {
    let request = Message::from_vec(request).unwrap();

    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .set_recursion_available(true)
        .add_queries(request.queries().to_vec());

    for question in request.queries() {
        response.add_answer(Record::from_rdata(
            question.name().clone(),
            300,
            RData::A(A(ip)),
        ));
    }

    response.to_vec().unwrap()
}

pub fn first_answer_ip(response: &Message) -> Option<Ipv4Addr> {
    response.answers().iter().find_map(|record| match record.data() {
        RData::A(a) => Some(a.0),
        _ => None,
    })
}
